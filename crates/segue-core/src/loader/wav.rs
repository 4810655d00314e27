//! PCM WAV provider
//!
//! Decodes with `hound`, converts to stereo (mono is duplicated, channels past
//! the second are dropped), resamples to the engine rate with `rubato` and
//! normalizes peaks above [`NORMALIZE_PEAK`].

use super::{normalize_peak, BufferError, BufferProvider, BufferResult, NORMALIZE_PEAK};
use crate::engine::TrackBuffer;
use crate::library::TrackRecord;
use crate::types::{StereoBuffer, StereoSample};
use rubato::{FftFixedIn, Resampler};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Sample-rate conversion failure
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Construction(#[from] rubato::ResamplerConstructionError),
    #[error(transparent)]
    Process(#[from] rubato::ResampleError),
}

/// Loads `TrackRecord::id` as a WAV file path
///
/// Relative paths are resolved against the base directory, usually the
/// directory holding the library file.
#[derive(Debug, Clone, Default)]
pub struct WavBufferProvider {
    base_dir: Option<PathBuf>,
}

impl WavBufferProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, id: &str) -> PathBuf {
        let path = Path::new(id);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl BufferProvider for WavBufferProvider {
    fn load(&self, track: &TrackRecord, sample_rate: u32) -> BufferResult<TrackBuffer> {
        let path = self.resolve(&track.id);
        if !path.is_file() {
            return Err(BufferError::Unavailable(track.id.clone()));
        }

        let (mut audio, source_rate) = decode_wav(&path).map_err(|e| match e {
            hound::Error::IoError(io) => BufferError::Io {
                id: track.id.clone(),
                message: io.to_string(),
            },
            other => BufferError::Decode {
                id: track.id.clone(),
                message: other.to_string(),
            },
        })?;

        if source_rate != sample_rate {
            log::debug!(
                "Resampling '{}' from {} Hz to {} Hz",
                track.name,
                source_rate,
                sample_rate
            );
            audio = resample(&audio, source_rate, sample_rate).map_err(|e| {
                BufferError::Resample {
                    id: track.id.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        if audio.is_empty() {
            return Err(BufferError::Empty(track.id.clone()));
        }

        let gain = normalize_peak(&mut audio, NORMALIZE_PEAK);
        log::info!(
            "Loaded '{}': {} frames at {} Hz{}",
            track.name,
            audio.len(),
            sample_rate,
            if gain < 1.0 {
                format!(", normalized by {:.3}", gain)
            } else {
                String::new()
            }
        );

        Ok(TrackBuffer::new(track.id.clone(), audio, sample_rate))
    }
}

/// Decode a PCM WAV file to stereo, returning the audio and its sample rate
pub fn decode_wav(path: &Path) -> Result<(StereoBuffer, u32), hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let frames = interleaved
        .chunks_exact(channels)
        .map(|frame| match frame {
            [mono] => StereoSample::mono(*mono),
            [left, right, ..] => StereoSample::new(*left, *right),
            [] => StereoSample::silence(),
        })
        .collect();

    Ok((StereoBuffer::from_vec(frames), spec.sample_rate))
}

/// Convert `audio` from `from` Hz to `to` Hz
///
/// The resampler's output delay is trimmed so the result lines up with the
/// input and has `len * to / from` frames.
pub fn resample(audio: &StereoBuffer, from: u32, to: u32) -> Result<StereoBuffer, ConvertError> {
    if from == to || audio.is_empty() {
        return Ok(audio.clone());
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, 2)?;
    let left: Vec<f32> = audio.iter().map(|s| s.left).collect();
    let right: Vec<f32> = audio.iter().map(|s| s.right).collect();

    let expected = (audio.len() as f64 * to as f64 / from as f64).round() as usize;
    let delay = resampler.output_delay();
    let mut out_left = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
    let mut out_right = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    loop {
        let needed = resampler.input_frames_next();
        if pos + needed > left.len() {
            break;
        }
        let input: [&[f32]; 2] = [&left[pos..pos + needed], &right[pos..pos + needed]];
        let output = resampler.process(&input[..], None)?;
        out_left.extend_from_slice(&output[0]);
        out_right.extend_from_slice(&output[1]);
        pos += needed;
    }

    if pos < left.len() {
        let input: [&[f32]; 2] = [&left[pos..], &right[pos..]];
        let output = resampler.process_partial(Some(&input[..]), None)?;
        out_left.extend_from_slice(&output[0]);
        out_right.extend_from_slice(&output[1]);
    }

    // Flush the delayed tail
    while out_left.len() < expected + delay {
        let output = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if output[0].is_empty() {
            break;
        }
        out_left.extend_from_slice(&output[0]);
        out_right.extend_from_slice(&output[1]);
    }

    let frames = out_left
        .iter()
        .zip(out_right.iter())
        .skip(delay)
        .take(expected)
        .map(|(&l, &r)| StereoSample::new(l, r))
        .collect();
    Ok(StereoBuffer::from_vec(frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::generate_tone;
    use tempfile::TempDir;

    fn write_int_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn write_float_wav(path: &Path, sample_rate: u32, audio: &StereoBuffer) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in audio.as_interleaved() {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn record(id: &str) -> TrackRecord {
        TrackRecord::new(id, id, 120.0, "8A", 0.1, 1.0)
    }

    #[test]
    fn test_decode_mono_int() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mono.wav");
        write_int_wav(&path, 1, 8000, &[16384, -16384, 0]);

        let (audio, rate) = decode_wav(&path).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(audio.len(), 3);
        assert_eq!(audio[0], StereoSample::mono(0.5));
        assert_eq!(audio[1], StereoSample::mono(-0.5));
    }

    #[test]
    fn test_decode_multichannel_keeps_first_two() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("quad.wav");
        write_int_wav(&path, 4, 8000, &[8192, -8192, 16384, 16384]);

        let (audio, _) = decode_wav(&path).unwrap();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0], StereoSample::new(0.25, -0.25));
    }

    #[test]
    fn test_resample_length_and_level() {
        let tone = generate_tone(440.0, 0.5, 1.0, 22050);
        let up = resample(&tone, 22050, 44100).unwrap();
        assert_eq!(up.len(), 44100);
        // Skip the edges; the body keeps its level
        let body_peak = up.as_slice()[4000..40000]
            .iter()
            .map(|s| s.peak())
            .fold(0.0f32, f32::max);
        assert!((body_peak - 0.5).abs() < 0.02, "peak {body_peak}");

        assert_eq!(resample(&tone, 22050, 22050).unwrap(), tone);
    }

    #[test]
    fn test_provider_resamples_and_normalizes() {
        let temp = TempDir::new().unwrap();
        let loud = generate_tone(220.0, 1.5, 0.5, 22050);
        write_float_wav(&temp.path().join("loud.wav"), 22050, &loud);

        let provider = WavBufferProvider::with_base_dir(temp.path());
        let buffer = provider.load(&record("loud.wav"), 44100).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.len(), 22050);
        assert!(buffer.audio().peak() <= NORMALIZE_PEAK + 1e-6);
        assert_eq!(buffer.id(), "loud.wav");
    }

    #[test]
    fn test_provider_errors() {
        let temp = TempDir::new().unwrap();
        let provider = WavBufferProvider::with_base_dir(temp.path());
        assert!(matches!(
            provider.load(&record("missing.wav"), 44100),
            Err(BufferError::Unavailable(_))
        ));

        std::fs::write(temp.path().join("garbage.wav"), b"not a wav file").unwrap();
        assert!(matches!(
            provider.load(&record("garbage.wav"), 44100),
            Err(BufferError::Decode { .. })
        ));

        write_int_wav(&temp.path().join("empty.wav"), 2, 44100, &[]);
        assert!(matches!(
            provider.load(&record("empty.wav"), 44100),
            Err(BufferError::Empty(_))
        ));
    }
}
