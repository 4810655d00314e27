//! Soft output limiter
//!
//! Master gain → **soft limiter** → output
//!
//! `y = tanh(x · drive) · ceiling`. Near-linear for quiet material, and the
//! output can never exceed `ceiling`, so a summed crossfade cannot clip.

use crate::types::StereoSample;

/// Default input drive
pub const DEFAULT_DRIVE: f32 = 0.95;

/// Default output ceiling (linear amplitude)
pub const DEFAULT_CEILING: f32 = 0.95;

/// Stateless tanh saturator applied to every rendered block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftLimiter {
    enabled: bool,
    drive: f32,
    ceiling: f32,
}

impl Default for SoftLimiter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SoftLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            drive: DEFAULT_DRIVE,
            ceiling: DEFAULT_CEILING,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[inline]
    pub fn process_sample(&self, x: f32) -> f32 {
        (x * self.drive).tanh() * self.ceiling
    }

    /// Limit a block in place (no-op when disabled)
    pub fn process(&self, frames: &mut [StereoSample]) {
        if !self.enabled {
            return;
        }
        for frame in frames {
            *frame = frame.map(|x| self.process_sample(x));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_bounds_output() {
        let limiter = SoftLimiter::default();
        let mut frames = [
            StereoSample::new(10.0, -10.0),
            StereoSample::new(0.0, 0.5),
        ];
        limiter.process(&mut frames);

        assert!(frames[0].left <= DEFAULT_CEILING && frames[0].left > 0.9);
        assert!(frames[0].right >= -DEFAULT_CEILING);
        assert_eq!(frames[1].left, 0.0);
        let expected = (0.5f32 * 0.95).tanh() * 0.95;
        assert!((frames[1].right - expected).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let limiter = SoftLimiter::new(false);
        let mut frames = [StereoSample::new(3.0, -0.25)];
        limiter.process(&mut frames);
        assert_eq!(frames[0], StereoSample::new(3.0, -0.25));
    }
}
