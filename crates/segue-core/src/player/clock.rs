//! Poll clocks
//!
//! The player waits between status polls through a [`PollClock`]. With a
//! device stream the audio thread owns the [`EngineRenderer`], so the clock
//! just sleeps. Offline, the clock owns it and renders the elapsed interval.

use crate::audio::{AudioResult, RenderSink, MAX_BUFFER_SIZE};
use crate::engine::EngineRenderer;
use crate::types::StereoBuffer;
use std::time::Duration;

/// Waits between player polls
pub trait PollClock {
    fn wait(&mut self, interval: Duration) -> AudioResult<()>;
}

/// Sleeps in real time while a device stream renders the engine
#[derive(Debug, Default, Clone, Copy)]
pub struct RealTimeClock;

impl PollClock for RealTimeClock {
    fn wait(&mut self, interval: Duration) -> AudioResult<()> {
        std::thread::sleep(interval);
        Ok(())
    }
}

/// Renders the engine for each interval instead of sleeping
///
/// Rendered blocks go to the optional sink (a WAV bounce, or a buffer in
/// tests). Fractional frames are carried over so long runs do not drift.
pub struct OfflineClock {
    renderer: EngineRenderer,
    sink: Option<Box<dyn RenderSink>>,
    block: StereoBuffer,
    block_frames: usize,
    carry: f64,
    rendered_frames: u64,
}

impl OfflineClock {
    pub fn new(renderer: EngineRenderer) -> Self {
        Self::with_block_size(renderer, 512)
    }

    /// Render in blocks of `block_frames` (clamped to `1..=MAX_BUFFER_SIZE`)
    pub fn with_block_size(renderer: EngineRenderer, block_frames: usize) -> Self {
        let block_frames = block_frames.clamp(1, MAX_BUFFER_SIZE);
        Self {
            renderer,
            sink: None,
            block: StereoBuffer::silence(block_frames),
            block_frames,
            carry: 0.0,
            rendered_frames: 0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn RenderSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Total frames rendered so far
    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames
    }

    /// Finish the sink and hand it back
    pub fn finish(mut self) -> AudioResult<Option<Box<dyn RenderSink>>> {
        if let Some(sink) = self.sink.as_mut() {
            sink.finish()?;
        }
        Ok(self.sink.take())
    }

    pub fn renderer(&self) -> &EngineRenderer {
        &self.renderer
    }

    /// Render exactly `frames` frames
    ///
    /// Queued commands are applied even when `frames` is zero.
    pub fn advance(&mut self, frames: usize) -> AudioResult<()> {
        self.renderer.process_commands();
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(self.block_frames);
            let block = &mut self.block.as_mut_slice()[..n];
            self.renderer.render_into(block);
            if let Some(sink) = self.sink.as_mut() {
                sink.write_block(block)?;
            }
            remaining -= n;
            self.rendered_frames += n as u64;
        }
        Ok(())
    }
}

impl PollClock for OfflineClock {
    fn wait(&mut self, interval: Duration) -> AudioResult<()> {
        let exact = interval.as_secs_f64() * self.renderer.sample_rate() as f64 + self.carry;
        let frames = exact.floor();
        self.carry = exact - frames;
        self.advance(frames as usize)
    }
}
