//! Engine control errors

use thiserror::Error;

/// Rejected engine control operations
///
/// Rendering never fails; only control-thread calls return these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Track buffer '{0}' is empty")]
    EmptyBuffer(String),

    #[error("Track buffer '{id}' is at {actual} Hz, engine renders at {expected} Hz")]
    SampleRateMismatch {
        id: String,
        expected: u32,
        actual: u32,
    },

    #[error("No track is playing")]
    NotPlaying,

    #[error("Engine command queue is full")]
    QueueFull,
}

pub type EngineResult<T> = Result<T, EngineError>;
