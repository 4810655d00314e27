//! Crossfade engine: two-buffer playback with a linear transition
//!
//! # State machine
//!
//! ```text
//!            play_track              begin_crossfade (next staged)
//!   Idle ───────────────▶ Playing ─────────────────────────────▶ Crossfading
//!    ▲                      ▲  ▲                                      │
//!    │        stop          │  └──────── window consumed ─────────────┘
//!    └──────────────────────┘            (current := next)
//! ```
//!
//! `render_into` is called from the audio callback with a fixed frame count
//! and always fills the whole block. It never allocates, blocks or logs.
//!
//! # Crossfade
//!
//! Frame `k` of the window mixes `current[cursor + k] * (1 - w)` with
//! `next[k] * w`, where `w = k / window`. When the window is consumed the
//! next buffer becomes current, already `window` frames in, and the rest of
//! the block renders in `Playing`.

use super::buffer::TrackBuffer;
use super::error::{EngineError, EngineResult};
use super::limiter::SoftLimiter;
use crate::types::{StereoBuffer, StereoSample};
use serde::{Deserialize, Serialize};

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of every crossfade in seconds
    pub crossfade_secs: f64,
    /// Linear gain applied before the limiter
    pub master_gain: f32,
    /// Enable the tanh soft limiter
    pub soft_limit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            crossfade_secs: 4.0,
            master_gain: 0.8,
            soft_limit: true,
        }
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossfadeState {
    Idle,
    Playing,
    Crossfading,
}

/// Snapshot of the engine for the control thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackInfo {
    pub playing: bool,
    /// Read position over current track length, in `[0, 1]`
    pub progress: f64,
    /// Seconds until the current track runs out
    pub remaining_secs: f64,
    pub crossfading: bool,
    pub next_staged: bool,
    /// Id of the current track
    pub current: Option<String>,
    /// Control commands the render thread has not applied yet; the other
    /// fields predate them
    pub pending: bool,
}

impl PlaybackInfo {
    /// Snapshot for a read position within a track of `len` frames
    pub(super) fn at_position(
        state: CrossfadeState,
        cursor: usize,
        len: usize,
        sample_rate: u32,
        next_staged: bool,
        current: Option<String>,
    ) -> Self {
        let (progress, remaining_secs) = if len > 0 {
            let progress = (cursor as f64 / len as f64).min(1.0);
            let remaining = len.saturating_sub(cursor) as f64 / sample_rate.max(1) as f64;
            (progress, remaining)
        } else {
            (0.0, 0.0)
        };

        Self {
            playing: state != CrossfadeState::Idle,
            progress,
            remaining_secs,
            crossfading: state == CrossfadeState::Crossfading,
            next_staged,
            current,
            pending: false,
        }
    }
}

/// Two-buffer player with a linear crossfade
pub struct CrossfadeEngine {
    sample_rate: u32,
    /// Crossfade length in frames
    window: usize,
    master_gain: f32,
    limiter: SoftLimiter,

    state: CrossfadeState,
    current: Option<TrackBuffer>,
    /// Read position in `current` (may run past its end)
    cursor: usize,
    next: Option<TrackBuffer>,
    /// Frames consumed from `next` during the crossfade
    xf_cursor: usize,
}

impl CrossfadeEngine {
    pub fn new(sample_rate: u32, config: &EngineConfig) -> Self {
        let window = (config.crossfade_secs.max(0.0) * sample_rate as f64).round() as usize;
        log::debug!(
            "CrossfadeEngine: {} Hz, window {} frames, gain {}, soft limit {}",
            sample_rate,
            window,
            config.master_gain,
            config.soft_limit
        );
        Self {
            sample_rate,
            window,
            master_gain: config.master_gain,
            limiter: SoftLimiter::new(config.soft_limit),
            state: CrossfadeState::Idle,
            current: None,
            cursor: 0,
            next: None,
            xf_cursor: 0,
        }
    }

    /// Replace the crossfade window (in frames)
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn state(&self) -> CrossfadeState {
        self.state
    }

    pub fn current(&self) -> Option<&TrackBuffer> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&TrackBuffer> {
        self.next.as_ref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current.as_ref().map(|b| b.id())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Control
    // ─────────────────────────────────────────────────────────────────────

    /// Start `buffer` from the top, dropping any staged next track
    pub fn play_track(&mut self, buffer: TrackBuffer) -> EngineResult<()> {
        self.check_buffer(&buffer)?;
        self.current = Some(buffer);
        self.cursor = 0;
        self.next = None;
        self.xf_cursor = 0;
        self.state = CrossfadeState::Playing;
        Ok(())
    }

    /// Stage the track to crossfade into, without touching playback
    pub fn stage_next(&mut self, buffer: TrackBuffer) -> EngineResult<()> {
        if self.state == CrossfadeState::Idle {
            return Err(EngineError::NotPlaying);
        }
        self.check_buffer(&buffer)?;
        self.next = Some(buffer);
        Ok(())
    }

    /// Start the crossfade into the staged track
    ///
    /// Returns false, changing nothing, when no track is staged.
    pub fn begin_crossfade(&mut self) -> bool {
        if self.next.is_none() || self.current.is_none() {
            return false;
        }
        self.xf_cursor = 0;
        self.state = CrossfadeState::Crossfading;
        true
    }

    /// Release both buffers and go idle
    pub fn stop(&mut self) {
        self.current = None;
        self.next = None;
        self.cursor = 0;
        self.xf_cursor = 0;
        self.state = CrossfadeState::Idle;
    }

    pub fn playback_info(&self) -> PlaybackInfo {
        PlaybackInfo::at_position(
            self.state,
            self.cursor,
            self.current.as_ref().map_or(0, |b| b.len()),
            self.sample_rate,
            self.next.is_some(),
            self.current.as_ref().map(|b| b.id().to_string()),
        )
    }

    fn check_buffer(&self, buffer: &TrackBuffer) -> EngineResult<()> {
        if buffer.is_empty() {
            return Err(EngineError::EmptyBuffer(buffer.id().to_string()));
        }
        if buffer.sample_rate() != self.sample_rate {
            return Err(EngineError::SampleRateMismatch {
                id: buffer.id().to_string(),
                expected: self.sample_rate,
                actual: buffer.sample_rate(),
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Render
    // ─────────────────────────────────────────────────────────────────────

    /// Render `frames` frames into a new buffer
    pub fn render(&mut self, frames: usize) -> StereoBuffer {
        let mut out = StereoBuffer::silence(frames);
        self.render_into(out.as_mut_slice());
        out
    }

    /// Fill `out` completely with the next block of audio
    pub fn render_into(&mut self, out: &mut [StereoSample]) {
        out.fill(StereoSample::silence());
        if !self.mix_into(out) {
            out.fill(StereoSample::silence());
            return;
        }

        let gain = self.master_gain;
        for frame in out.iter_mut() {
            *frame *= gain;
        }
        self.limiter.process(out);
    }

    /// Returns false on an inconsistent state
    fn mix_into(&mut self, out: &mut [StereoSample]) -> bool {
        let total = out.len();
        let mut written = 0;

        while written < total {
            match self.state {
                CrossfadeState::Idle => return true,

                CrossfadeState::Playing => {
                    let Some(current) = &self.current else {
                        return false;
                    };
                    let cursor = self.cursor;
                    for (k, frame) in out[written..].iter_mut().enumerate() {
                        *frame = current.frame(cursor.saturating_add(k));
                    }
                    self.cursor = cursor.saturating_add(total - written);
                    written = total;
                }

                CrossfadeState::Crossfading => {
                    let (Some(current), Some(next)) = (&self.current, &self.next) else {
                        return false;
                    };
                    if self.xf_cursor >= self.window {
                        self.complete_crossfade();
                        continue;
                    }

                    let chunk = (total - written).min(self.window - self.xf_cursor);
                    let (cursor, xf) = (self.cursor, self.xf_cursor);
                    let window = self.window as f32;
                    for k in 0..chunk {
                        let w_next = (xf + k) as f32 / window;
                        let w_current = 1.0 - w_next;
                        out[written + k] = current.frame(cursor.saturating_add(k)) * w_current
                            + next.frame(xf + k) * w_next;
                    }

                    self.cursor = cursor.saturating_add(chunk);
                    self.xf_cursor = xf + chunk;
                    written += chunk;

                    if self.xf_cursor >= self.window {
                        self.complete_crossfade();
                    }
                }
            }
        }
        true
    }

    /// Promote the staged track; the retired buffer is reclaimed by the GC thread
    fn complete_crossfade(&mut self) {
        self.current = self.next.take();
        self.cursor = self.xf_cursor;
        self.xf_cursor = 0;
        self.state = if self.current.is_some() {
            CrossfadeState::Playing
        } else {
            CrossfadeState::Idle
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    fn unity_config() -> EngineConfig {
        EngineConfig {
            crossfade_secs: 0.1,
            master_gain: 1.0,
            soft_limit: false,
        }
    }

    fn constant(id: &str, frames: usize, value: f32) -> TrackBuffer {
        TrackBuffer::new(id, StereoBuffer::constant(frames, value), RATE)
    }

    fn engine() -> CrossfadeEngine {
        CrossfadeEngine::new(RATE, &unity_config())
    }

    #[test]
    fn test_window_from_config() {
        assert_eq!(engine().window(), 100);
        let default = CrossfadeEngine::new(44100, &EngineConfig::default());
        assert_eq!(default.window(), 4 * 44100);
    }

    #[test]
    fn test_idle_renders_silence() {
        let mut engine = engine();
        let out = engine.render(64);
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_render_exact_frame_count_in_every_state() {
        let mut engine = engine();
        for frames in [0, 1, 7, 100, 513] {
            assert_eq!(engine.render(frames).len(), frames);
        }

        engine.play_track(constant("a", 300, 0.5)).unwrap();
        for frames in [0, 1, 7, 100, 513] {
            assert_eq!(engine.render(frames).len(), frames);
        }

        engine.play_track(constant("a", 300, 0.5)).unwrap();
        engine.stage_next(constant("b", 300, 0.25)).unwrap();
        assert!(engine.begin_crossfade());
        for frames in [1, 7, 64, 513] {
            assert_eq!(engine.render(frames).len(), frames);
        }
    }

    #[test]
    fn test_playing_zero_fills_past_end() {
        let mut engine = engine();
        engine.play_track(constant("a", 10, 0.5)).unwrap();
        let out = engine.render(16);
        assert_eq!(out[9], StereoSample::mono(0.5));
        assert_eq!(out[10], StereoSample::silence());
        assert_eq!(engine.cursor(), 16);

        let info = engine.playback_info();
        assert!(info.playing);
        assert_eq!(info.progress, 1.0);
        assert_eq!(info.remaining_secs, 0.0);
    }

    #[test]
    fn test_crossfade_ones_into_zeros() {
        let mut engine = engine();
        engine.play_track(constant("ones", 1000, 1.0)).unwrap();
        engine.stage_next(constant("zeros", 1000, 0.0)).unwrap();
        assert!(engine.begin_crossfade());
        assert_eq!(engine.state(), CrossfadeState::Crossfading);

        let out = engine.render(100);
        assert_eq!(out[0], StereoSample::mono(1.0));
        assert!((out[50].left - 0.5).abs() < 1e-6);
        assert!((out[50].right - 0.5).abs() < 1e-6);
        assert!((out[99].left - 0.01).abs() < 1e-6);

        assert_eq!(engine.state(), CrossfadeState::Playing);
        assert_eq!(engine.current_track_id(), Some("zeros"));
        assert!(engine.next().is_none());
        assert_eq!(engine.cursor(), 100);
    }

    #[test]
    fn test_crossfade_reads_next_from_its_start_across_blocks() {
        let mut engine = engine();
        engine.play_track(constant("a", 1000, 0.0)).unwrap();

        let ramp: Vec<StereoSample> = (0..1000).map(|i| StereoSample::mono(i as f32)).collect();
        engine
            .stage_next(TrackBuffer::new("ramp", StereoBuffer::from_vec(ramp), RATE))
            .unwrap();
        assert!(engine.begin_crossfade());

        // Split across uneven blocks; frame k of the fade reads next[k]
        let mut rendered = Vec::new();
        for block in [30, 30, 70] {
            rendered.extend_from_slice(engine.render(block).as_slice());
        }
        for k in [0usize, 29, 30, 60, 99] {
            let expected = k as f32 * (k as f32 / 100.0);
            assert!((rendered[k].left - expected).abs() < 1e-3, "frame {k}");
        }
        // Remainder of the last block continues in Playing from frame 100
        assert!((rendered[100].left - 100.0).abs() < 1e-6);
        assert!((rendered[129].left - 129.0).abs() < 1e-6);
        assert_eq!(engine.cursor(), 130);
    }

    #[test]
    fn test_crossfade_continues_past_end_of_current() {
        let mut engine = engine();
        engine.play_track(constant("short", 20, 1.0)).unwrap();
        engine.stage_next(constant("next", 500, 0.5)).unwrap();
        engine.begin_crossfade();

        let out = engine.render(100);
        assert_eq!(out[30], StereoSample::mono(0.5 * 0.3));
        assert_eq!(engine.current_track_id(), Some("next"));
    }

    #[test]
    fn test_zero_window_swaps_immediately() {
        let mut engine = engine().with_window(0);
        engine.play_track(constant("a", 100, 1.0)).unwrap();
        engine.stage_next(constant("b", 100, 0.25)).unwrap();
        assert!(engine.begin_crossfade());

        let out = engine.render(4);
        assert_eq!(out[0], StereoSample::mono(0.25));
        assert_eq!(engine.state(), CrossfadeState::Playing);
        assert_eq!(engine.current_track_id(), Some("b"));
        assert_eq!(engine.cursor(), 4);
    }

    #[test]
    fn test_begin_crossfade_without_next() {
        let mut engine = engine();
        assert!(!engine.begin_crossfade());
        assert_eq!(engine.state(), CrossfadeState::Idle);

        engine.play_track(constant("a", 100, 1.0)).unwrap();
        engine.render(10);
        assert!(!engine.begin_crossfade());
        assert_eq!(engine.state(), CrossfadeState::Playing);
        assert_eq!(engine.cursor(), 10);
    }

    #[test]
    fn test_control_errors() {
        let mut engine = engine();
        assert_eq!(
            engine.stage_next(constant("b", 10, 1.0)),
            Err(EngineError::NotPlaying)
        );
        assert_eq!(
            engine.play_track(constant("empty", 0, 1.0)),
            Err(EngineError::EmptyBuffer("empty".to_string()))
        );
        let wrong_rate = TrackBuffer::new("hi-res", StereoBuffer::silence(10), 96000);
        assert!(matches!(
            engine.play_track(wrong_rate),
            Err(EngineError::SampleRateMismatch { expected: RATE, actual: 96000, .. })
        ));
        assert_eq!(engine.state(), CrossfadeState::Idle);
    }

    #[test]
    fn test_play_track_clears_next() {
        let mut engine = engine();
        engine.play_track(constant("a", 100, 1.0)).unwrap();
        engine.stage_next(constant("b", 100, 1.0)).unwrap();
        assert!(engine.playback_info().next_staged);

        engine.play_track(constant("c", 100, 1.0)).unwrap();
        let info = engine.playback_info();
        assert!(!info.next_staged);
        assert_eq!(info.current.as_deref(), Some("c"));
        assert_eq!(info.progress, 0.0);
    }

    #[test]
    fn test_playback_info_progress() {
        let mut engine = engine();
        engine.play_track(constant("a", 2000, 1.0)).unwrap();
        engine.render(500);

        let info = engine.playback_info();
        assert!((info.progress - 0.25).abs() < 1e-12);
        assert!((info.remaining_secs - 1.5).abs() < 1e-12);
        assert!(!info.crossfading);
    }

    #[test]
    fn test_stop_releases_buffers() {
        let mut engine = engine();
        engine.play_track(constant("a", 100, 1.0)).unwrap();
        engine.stage_next(constant("b", 100, 1.0)).unwrap();
        engine.stop();

        assert_eq!(engine.state(), CrossfadeState::Idle);
        assert!(engine.current().is_none());
        assert!(engine.next().is_none());
        assert_eq!(engine.playback_info(), PlaybackInfo::default());
    }

    #[test]
    fn test_gain_and_limiter_applied() {
        let config = EngineConfig {
            crossfade_secs: 0.1,
            master_gain: 0.8,
            soft_limit: true,
        };
        let mut engine = CrossfadeEngine::new(RATE, &config);
        engine.play_track(constant("loud", 100, 2.0)).unwrap();

        let out = engine.render(1);
        let expected = (2.0f32 * 0.8 * 0.95).tanh() * 0.95;
        assert!((out[0].left - expected).abs() < 1e-6);
        assert!(out[0].left < 0.95);
    }
}
