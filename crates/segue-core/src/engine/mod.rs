//! Playback engine
//!
//! - [`CrossfadeEngine`]: current/next buffers and the crossfade state machine
//! - [`EngineController`] / [`EngineRenderer`]: the control thread queues
//!   commands over an `rtrb` ring buffer; the render thread applies them and
//!   publishes status through atomics
//! - [`TrackBuffer`]: decoded audio whose deallocation is deferred to the GC
//!   thread

mod buffer;
mod crossfade;
mod command;
mod error;
pub mod gc;
mod handle;
mod limiter;

pub use buffer::TrackBuffer;
pub use crossfade::{CrossfadeEngine, CrossfadeState, EngineConfig, PlaybackInfo};
pub use command::{command_channel, EngineCommand, COMMAND_QUEUE_CAPACITY};
pub use error::{EngineError, EngineResult};
pub use handle::{engine_channel, EngineAtomics, EngineController, EngineRenderer};
pub use limiter::{SoftLimiter, DEFAULT_CEILING, DEFAULT_DRIVE};
