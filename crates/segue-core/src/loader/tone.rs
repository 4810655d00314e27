//! Sine test tone for checking the output path

use crate::engine::TrackBuffer;
use crate::types::{StereoBuffer, StereoSample};
use std::f64::consts::TAU;

pub const TEST_TONE_FREQ: f64 = 440.0;
pub const TEST_TONE_AMPLITUDE: f32 = 0.3;

/// Identity given to the test tone buffer
pub const TEST_TONE_ID: &str = "test-tone";

/// Stereo sine of `secs` seconds
pub fn generate_tone(freq: f64, amplitude: f32, secs: f64, sample_rate: u32) -> StereoBuffer {
    let frames = (secs.max(0.0) * sample_rate as f64).round() as usize;
    let step = TAU * freq / sample_rate.max(1) as f64;
    let mut audio = StereoBuffer::with_capacity(frames);
    for i in 0..frames {
        let value = (step * i as f64).sin() as f32 * amplitude;
        audio.push(StereoSample::mono(value));
    }
    audio
}

/// 440 Hz test tone at amplitude 0.3
pub fn test_tone(secs: f64, sample_rate: u32) -> TrackBuffer {
    TrackBuffer::new(
        TEST_TONE_ID,
        generate_tone(TEST_TONE_FREQ, TEST_TONE_AMPLITUDE, secs, sample_rate),
        sample_rate,
    )
}
