//! Audio output errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the output device or the offline bounce sink
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output devices found")]
    NoDevices,

    #[error("No default output device: {0}")]
    NoDefaultDevice(String),

    #[error("Output device '{0}' not found")]
    DeviceNotFound(String),

    /// The device offers no usable f32 configuration
    #[error("Unsupported output configuration: {0}")]
    ConfigError(String),

    #[error("Failed to open output stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to start output stream: {0}")]
    StreamPlayError(String),

    #[error("Bounce to {path:?} failed: {message}")]
    Bounce { path: PathBuf, message: String },
}

impl AudioError {
    pub(crate) fn bounce(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Bounce {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
