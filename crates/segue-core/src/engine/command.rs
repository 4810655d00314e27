//! Control commands for the render thread
//!
//! The control thread pushes [`EngineCommand`]s into a wait-free SPSC ring
//! buffer; the render thread drains it at the start of every block. Track
//! buffers travel as [`TrackBuffer`] handles, so nothing is decoded or
//! allocated on the audio side.

use super::buffer::TrackBuffer;

/// Commands applied by the render thread between blocks
pub enum EngineCommand {
    /// Start a track from the top, dropping any staged next track
    PlayTrack { buffer: TrackBuffer, serial: u64 },
    /// Stage the track to crossfade into
    StageNext { buffer: TrackBuffer, serial: u64 },
    BeginCrossfade,
    Stop,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlayTrack { buffer, serial } => f
                .debug_struct("PlayTrack")
                .field("track", &buffer.id())
                .field("serial", serial)
                .finish(),
            Self::StageNext { buffer, serial } => f
                .debug_struct("StageNext")
                .field("track", &buffer.id())
                .field("serial", serial)
                .finish(),
            Self::BeginCrossfade => write!(f, "BeginCrossfade"),
            Self::Stop => write!(f, "Stop"),
        }
    }
}

/// Room for many polls' worth of commands; the player sends at most a few
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create the command queue: producer for the control thread, consumer for
/// the render thread
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
