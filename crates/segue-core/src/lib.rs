//! Segue Core - harmonic tour planning and crossfade playback
//!
//! Orders a library of analyzed tracks into a low-cost harmonic tour and
//! plays it with automatic crossfades.
//!
//! - [`compat`]: Camelot key, tempo and energy distances
//! - [`tour`]: distance matrix, nearest-neighbor + 2-opt solver, reports
//! - [`engine`]: real-time two-slot crossfade engine
//! - [`player`]: control loop that walks a tour through the engine
//! - [`audio`]: cpal output and offline WAV bounce

pub mod audio;
pub mod compat;
pub mod config;
pub mod engine;
pub mod library;
pub mod loader;
pub mod music;
pub mod player;
pub mod tour;
pub mod types;

pub use types::*;
