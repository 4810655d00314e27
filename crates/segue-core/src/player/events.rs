//! Player events for front ends

use crossbeam::channel::{self, Receiver, Sender};
use std::fmt;

/// Something the tour player did
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A track was loaded and started from the top
    TrackStarted { position: usize, track: usize, name: String },
    /// The next track was loaded and staged
    NextStaged {
        position: usize,
        track: usize,
        name: String,
        compatibility: f64,
        start_ratio: f64,
    },
    /// A crossfade between two tour positions began
    CrossfadeStarted { from: usize, to: usize },
    /// The crossfade finished; `position` is now playing
    CrossfadeCompleted { position: usize, track: usize, name: String },
    /// A track could not be loaded or started
    TrackSkipped {
        position: usize,
        track: usize,
        name: String,
        reason: String,
    },
    TourFinished { played: usize, stopped: bool },
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackStarted { position, name, .. } => {
                write!(f, "[{}] Now playing: {}", position + 1, name)
            }
            Self::NextStaged {
                position,
                name,
                compatibility,
                start_ratio,
                ..
            } => write!(
                f,
                "[{}] Up next: {} (compatibility {:.2}, crossfade at {:.0}%)",
                position + 1,
                name,
                compatibility,
                start_ratio * 100.0
            ),
            Self::CrossfadeStarted { from, to } => {
                write!(f, "Crossfading {} -> {}", from + 1, to + 1)
            }
            Self::CrossfadeCompleted { position, name, .. } => {
                write!(f, "[{}] Now playing: {}", position + 1, name)
            }
            Self::TrackSkipped {
                position,
                name,
                reason,
                ..
            } => write!(f, "[{}] Skipped {}: {}", position + 1, name, reason),
            Self::TourFinished { played, stopped } => {
                if *stopped {
                    write!(f, "Tour stopped after {} tracks", played)
                } else {
                    write!(f, "Tour finished: {} tracks played", played)
                }
            }
        }
    }
}

/// Unbounded channel for [`PlayerEvent`]s
pub fn event_channel() -> (Sender<PlayerEvent>, Receiver<PlayerEvent>) {
    channel::unbounded()
}
