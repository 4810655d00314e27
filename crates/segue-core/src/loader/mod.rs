//! Track buffer providers
//!
//! The player asks a [`BufferProvider`] for decoded, stereo audio at the
//! engine's sample rate. Providers run on the control thread, never on the
//! render thread.

mod tone;
mod wav;

pub use tone::{generate_tone, test_tone, TEST_TONE_AMPLITUDE, TEST_TONE_FREQ, TEST_TONE_ID};
pub use wav::{decode_wav, resample, WavBufferProvider};

use crate::engine::TrackBuffer;
use crate::library::TrackRecord;
use crate::types::StereoBuffer;
use std::collections::HashMap;
use thiserror::Error;

/// Peak level loaded tracks are normalized down to
pub const NORMALIZE_PEAK: f32 = 0.95;

/// Why a track's audio could not be provided
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Audio for '{0}' is unavailable")]
    Unavailable(String),

    #[error("Failed to read '{id}': {message}")]
    Io { id: String, message: String },

    #[error("Failed to decode '{id}': {message}")]
    Decode { id: String, message: String },

    #[error("Failed to resample '{id}': {message}")]
    Resample { id: String, message: String },

    #[error("Audio for '{0}' contains no frames")]
    Empty(String),
}

pub type BufferResult<T> = Result<T, BufferError>;

/// Supplies decoded audio for a track
pub trait BufferProvider {
    /// Decoded stereo audio for `track` at `sample_rate`
    fn load(&self, track: &TrackRecord, sample_rate: u32) -> BufferResult<TrackBuffer>;
}

/// Scale `audio` down so its peak is at most `ceiling`
///
/// Quieter audio is left untouched. Returns the applied gain.
pub fn normalize_peak(audio: &mut StereoBuffer, ceiling: f32) -> f32 {
    let peak = audio.peak();
    if peak > ceiling {
        let gain = ceiling / peak;
        audio.scale(gain);
        gain
    } else {
        1.0
    }
}

/// Provider over pre-decoded audio, keyed by track id
///
/// Buffers must already be at the requested sample rate.
#[derive(Default)]
pub struct MemoryBufferProvider {
    buffers: HashMap<String, StereoBuffer>,
}

impl MemoryBufferProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, audio: StereoBuffer) {
        self.buffers.insert(id.into(), audio);
    }

    pub fn with(mut self, id: impl Into<String>, audio: StereoBuffer) -> Self {
        self.insert(id, audio);
        self
    }
}

impl BufferProvider for MemoryBufferProvider {
    fn load(&self, track: &TrackRecord, sample_rate: u32) -> BufferResult<TrackBuffer> {
        let audio = self
            .buffers
            .get(&track.id)
            .ok_or_else(|| BufferError::Unavailable(track.id.clone()))?;
        if audio.is_empty() {
            return Err(BufferError::Empty(track.id.clone()));
        }
        Ok(TrackBuffer::new(track.id.clone(), audio.clone(), sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TrackRecord {
        TrackRecord::new(id, id, 120.0, "8A", 0.1, 1.0)
    }

    #[test]
    fn test_normalize_peak() {
        let mut loud = StereoBuffer::from_interleaved(&[1.9, -0.5, 0.2, 0.1]);
        let gain = normalize_peak(&mut loud, NORMALIZE_PEAK);
        assert!((gain - 0.5).abs() < 1e-6);
        assert!((loud.peak() - 0.95).abs() < 1e-6);

        let mut quiet = StereoBuffer::constant(4, 0.5);
        assert_eq!(normalize_peak(&mut quiet, NORMALIZE_PEAK), 1.0);
        assert_eq!(quiet, StereoBuffer::constant(4, 0.5));
    }

    #[test]
    fn test_memory_provider() {
        let provider = MemoryBufferProvider::new()
            .with("a", StereoBuffer::constant(10, 0.1))
            .with("empty", StereoBuffer::default());

        let buffer = provider.load(&record("a"), 1000).unwrap();
        assert_eq!(buffer.id(), "a");
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.sample_rate(), 1000);

        assert!(matches!(
            provider.load(&record("missing"), 1000),
            Err(BufferError::Unavailable(_))
        ));
        assert!(matches!(
            provider.load(&record("empty"), 1000),
            Err(BufferError::Empty(_))
        ));
    }
}
