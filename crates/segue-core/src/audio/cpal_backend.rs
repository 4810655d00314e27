//! cpal output stream
//!
//! ```text
//! ┌──────────────────┐  play_track / stage_next / ...  ┌─────────────────────┐
//! │  Control thread  │───── rtrb command queue ───────►│  cpal audio thread  │
//! │ EngineController │◄──────── EngineAtomics ─────────│   EngineRenderer    │
//! └──────────────────┘                                 │  render_into(block) │
//!                                                      └─────────────────────┘
//! ```
//!
//! The callback renders into a pre-allocated block and copies it to the
//! device's interleaved buffer, zeroing channels past the second.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::config::{AudioConfig, MAX_BUFFER_SIZE};
use super::device::{find_device_by_id, get_default_device};
use super::error::{AudioError, AudioResult};
use crate::engine::{
    engine_channel, CrossfadeEngine, EngineConfig, EngineController, EngineRenderer,
};
use crate::types::StereoBuffer;

/// Keeps the output stream alive; drop it to stop audio
pub struct CpalAudioHandle {
    _stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
}

impl CpalAudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// A running output stream and the engine it renders
pub struct AudioSystem {
    pub handle: CpalAudioHandle,
    /// Control half of the engine rendered by the stream
    pub engine: EngineController,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub latency_ms: f32,
}

/// Open the configured device and start rendering a new engine
///
/// The engine runs at the sample rate negotiated with the device.
pub fn start_audio_output(
    config: &AudioConfig,
    engine_config: &EngineConfig,
) -> AudioResult<AudioSystem> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => get_default_device()?,
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let supported = get_output_config(&device, config)?;
    let sample_rate = supported.sample_rate().0;
    let buffer_size = config.buffer_size.frames();

    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };
    let latency_ms = config.buffer_size.latency_ms(sample_rate);

    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
        stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    let (engine, renderer) = engine_channel(CrossfadeEngine::new(sample_rate, engine_config));
    let stream = build_output_stream(&device, &stream_config, renderer)?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!("Audio stream started");

    Ok(AudioSystem {
        handle: CpalAudioHandle {
            _stream: stream,
            sample_rate,
            buffer_size,
        },
        engine,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// Pick an f32 stereo config covering the requested sample rate
///
/// Falls back to any stereo config, then to any config, and to the config's
/// maximum rate if the requested one is out of range.
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target = config.target_sample_rate();
    let in_range = |c: &cpal::SupportedStreamConfigRange| {
        target >= c.min_sample_rate().0 && target <= c.max_sample_rate().0
    };

    let best = supported_configs
        .iter()
        .find(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 2 && in_range(c))
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 2)
        })
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32)
        })
        .ok_or_else(|| {
            AudioError::ConfigError("No f32 output configuration available".to_string())
        })?;

    let sample_rate = if in_range(best) {
        cpal::SampleRate(target)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz (tracks will be resampled)",
            target,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: EngineRenderer,
) -> AudioResult<Stream> {
    let channels = config.channels.max(1) as usize;
    let mut block = StereoBuffer::silence(MAX_BUFFER_SIZE);

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(channels * MAX_BUFFER_SIZE) {
                    let n_frames = chunk.len() / channels;
                    let rendered = &mut block.as_mut_slice()[..n_frames];
                    renderer.render_into(rendered);

                    for (frame, sample) in chunk.chunks_mut(channels).zip(rendered.iter()) {
                        frame[0] = sample.left;
                        if channels > 1 {
                            frame[1] = sample.right;
                        }
                        for ch in frame.iter_mut().skip(2) {
                            *ch = 0.0;
                        }
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
