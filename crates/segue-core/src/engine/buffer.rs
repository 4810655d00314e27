//! Decoded track audio shared between the control and render threads

use super::gc::gc_handle;
use crate::types::{StereoBuffer, StereoSample};
use basedrop::Shared;

struct TrackAudio {
    id: String,
    audio: StereoBuffer,
    sample_rate: u32,
}

/// Decoded stereo audio for one track
///
/// Cloning is cheap (reference count). Dropping the last clone defers the
/// deallocation to the GC thread, so buffers may be retired on the render
/// thread.
#[derive(Clone)]
pub struct TrackBuffer {
    inner: Shared<TrackAudio>,
}

impl TrackBuffer {
    pub fn new(id: impl Into<String>, audio: StereoBuffer, sample_rate: u32) -> Self {
        Self {
            inner: Shared::new(
                &gc_handle(),
                TrackAudio {
                    id: id.into(),
                    audio,
                    sample_rate,
                },
            ),
        }
    }

    /// Identity of the track this audio belongs to
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn audio(&self) -> &StereoBuffer {
        &self.inner.audio
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    /// Length in frames
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.audio.is_empty()
    }

    /// Frame at `index`, silence past the end
    #[inline]
    pub fn frame(&self, index: usize) -> StereoSample {
        self.inner.audio.get_or_silence(index)
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate().max(1) as f64
    }

    /// Whether two handles point at the same decoded audio
    pub fn ptr_eq(&self, other: &TrackBuffer) -> bool {
        std::ptr::eq(&*self.inner, &*other.inner)
    }
}

impl std::fmt::Debug for TrackBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackBuffer")
            .field("id", &self.id())
            .field("frames", &self.len())
            .field("sample_rate", &self.sample_rate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_buffer_accessors() {
        let buffer = TrackBuffer::new("a.wav", StereoBuffer::constant(22050, 0.5), 44100);
        assert_eq!(buffer.id(), "a.wav");
        assert_eq!(buffer.len(), 22050);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-12);
        assert_eq!(buffer.frame(0), StereoSample::mono(0.5));
        assert_eq!(buffer.frame(22050), StereoSample::silence());
    }

    #[test]
    fn test_clone_shares_audio() {
        let a = TrackBuffer::new("a", StereoBuffer::silence(4), 44100);
        let b = a.clone();
        let c = TrackBuffer::new("a", StereoBuffer::silence(4), 44100);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
