//! Tour playback
//!
//! [`TourPlayer`] walks a solved tour on the control thread. For each
//! position it makes sure the track is current, stages the following track
//! and polls the engine until the crossfade point:
//!
//! ```text
//! start ratio = base + span * compatibility     (0.8 + 0.15 * c by default)
//!
//!   progress ──────────────────────────────┬──────────────┐
//!   0                                      ratio          1
//!                                          begin_crossfade
//! ```
//!
//! A track that became current through a completed crossfade is not
//! reloaded. If the crossfade point is never reached and less than
//! `crossfade_exit_secs` remain, the player moves on and starts the next
//! track directly.

mod clock;
mod events;

pub use clock::{OfflineClock, PollClock, RealTimeClock};
pub use events::{event_channel, PlayerEvent};

use crate::audio::AudioError;
use crate::compat::CompatibilityModel;
use crate::engine::EngineController;
use crate::library::TrackRecord;
use crate::loader::BufferProvider;
use crate::tour::Tour;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// What happens after the last track of the tour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfTour {
    /// The last track plays to completion
    #[default]
    PlayOut,
    /// The last track crossfades into the first, until stopped
    Loop,
}

/// Polling and transition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub poll_interval_ms: u64,
    /// Give up waiting for the crossfade point below this many seconds left
    pub crossfade_exit_secs: f64,
    /// Poll interval while the last track plays out
    pub completion_poll_ms: u64,
    /// The last track counts as finished below this many seconds left
    pub completion_epsilon_secs: f64,
    pub start_ratio_base: f64,
    pub start_ratio_span: f64,
    pub end_of_tour: EndOfTour,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            crossfade_exit_secs: 0.5,
            completion_poll_ms: 500,
            completion_epsilon_secs: 0.1,
            start_ratio_base: 0.8,
            start_ratio_span: 0.15,
            end_of_tour: EndOfTour::PlayOut,
        }
    }
}

impl PlayerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn completion_poll(&self) -> Duration {
        Duration::from_millis(self.completion_poll_ms.max(1))
    }
}

/// Shared flag that ends a tour at the next poll
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Tour references track {index} but the library has {len} tracks")]
    TrackIndex { index: usize, len: usize },

    #[error("Render sink failed: {0}")]
    Sink(#[from] AudioError),
}

/// Totals for one call to [`TourPlayer::play`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Tracks that became current
    pub played: usize,
    pub skipped: usize,
    /// Completed crossfades
    pub crossfades: usize,
    /// Ended by the stop flag
    pub stopped: bool,
}

/// How the wait for a crossfade ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Completed,
    SafetyExit,
    Halted,
}

/// Plays a tour through an [`EngineController`]
pub struct TourPlayer {
    config: PlayerConfig,
    model: CompatibilityModel,
    stop: StopFlag,
    events: Option<Sender<PlayerEvent>>,
}

impl TourPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            model: CompatibilityModel::default(),
            stop: StopFlag::new(),
            events: None,
        }
    }

    /// Compatibility model used for crossfade timing
    pub fn with_model(mut self, model: CompatibilityModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_events(mut self, events: Sender<PlayerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Handle for stopping the tour from another thread
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Progress at which the crossfade into a track of this compatibility starts
    pub fn crossfade_start_ratio(&self, compatibility: f64) -> f64 {
        self.config.start_ratio_base + self.config.start_ratio_span * compatibility.clamp(0.0, 1.0)
    }

    /// Play `tour` to the end (or until stopped), then stop the engine
    ///
    /// Tracks whose audio cannot be loaded are skipped with a warning.
    pub fn play(
        &self,
        tour: &Tour,
        tracks: &[TrackRecord],
        provider: &dyn BufferProvider,
        engine: &mut EngineController,
        clock: &mut dyn PollClock,
    ) -> Result<PlaybackSummary, PlayerError> {
        if let Some(&index) = tour.order().iter().find(|&&i| i >= tracks.len()) {
            return Err(PlayerError::TrackIndex {
                index,
                len: tracks.len(),
            });
        }

        let order = tour.order();
        let n = order.len();
        let mut summary = PlaybackSummary::default();
        let mut position = 0;
        let mut already_current = false;
        let mut failed_in_row = 0;

        log::info!("Playing tour of {} tracks ({:?})", n, self.config.end_of_tour);

        while n > 0 && !self.stop.is_stopped() {
            let index = order[position];
            let track = &tracks[index];

            if !already_current {
                if let Err(reason) = self.start(track, provider, engine) {
                    self.skip(position, index, track, reason, &mut summary);
                    failed_in_row += 1;
                    match self.next_position(position, n) {
                        Some(next) if failed_in_row < n => {
                            position = next;
                            continue;
                        }
                        _ => break,
                    }
                }
                log::info!("[{}/{}] Now playing: {}", position + 1, n, track.name);
                self.emit(PlayerEvent::TrackStarted {
                    position,
                    track: index,
                    name: track.name.clone(),
                });
                summary.played += 1;
            }
            failed_in_row = 0;
            already_current = false;

            let Some((next_position, start_ratio)) =
                self.stage_following(position, order, tracks, provider, engine, &mut summary)
            else {
                self.wait_for_end(engine, clock)?;
                break;
            };

            match self.run_transition(position, next_position, start_ratio, engine, clock)? {
                Transition::Completed => {
                    let next_index = order[next_position];
                    self.emit(PlayerEvent::CrossfadeCompleted {
                        position: next_position,
                        track: next_index,
                        name: tracks[next_index].name.clone(),
                    });
                    log::info!(
                        "[{}/{}] Now playing: {}",
                        next_position + 1,
                        n,
                        tracks[next_index].name
                    );
                    summary.crossfades += 1;
                    summary.played += 1;
                    already_current = true;
                    position = next_position;
                }
                Transition::SafetyExit => position = next_position,
                Transition::Halted => break,
            }
        }

        engine.stop();
        summary.stopped = self.stop.is_stopped();
        log::info!(
            "Tour {}: {} played, {} skipped, {} crossfades",
            if summary.stopped { "stopped" } else { "finished" },
            summary.played,
            summary.skipped,
            summary.crossfades
        );
        self.emit(PlayerEvent::TourFinished {
            played: summary.played,
            stopped: summary.stopped,
        });
        Ok(summary)
    }

    fn next_position(&self, position: usize, n: usize) -> Option<usize> {
        if position + 1 < n {
            Some(position + 1)
        } else if self.config.end_of_tour == EndOfTour::Loop && n > 0 {
            Some(0)
        } else {
            None
        }
    }

    fn start(
        &self,
        track: &TrackRecord,
        provider: &dyn BufferProvider,
        engine: &mut EngineController,
    ) -> Result<(), String> {
        let buffer = provider
            .load(track, engine.sample_rate())
            .map_err(|e| e.to_string())?;
        engine.play_track(buffer).map_err(|e| e.to_string())
    }

    /// Load and stage the first loadable track after `position`
    fn stage_following(
        &self,
        position: usize,
        order: &[usize],
        tracks: &[TrackRecord],
        provider: &dyn BufferProvider,
        engine: &mut EngineController,
        summary: &mut PlaybackSummary,
    ) -> Option<(usize, f64)> {
        let n = order.len();
        let current = &tracks[order[position]];
        let mut candidate = self.next_position(position, n);
        let mut attempts = 0;

        while let Some(next_position) = candidate {
            if attempts >= n {
                break;
            }
            attempts += 1;

            let index = order[next_position];
            let next = &tracks[index];
            let staged = provider
                .load(next, engine.sample_rate())
                .map_err(|e| e.to_string())
                .and_then(|buffer| engine.stage_next(buffer).map_err(|e| e.to_string()));

            match staged {
                Ok(()) => {
                    let compatibility = self.model.crossfade_compatibility(current, next);
                    let start_ratio = self.crossfade_start_ratio(compatibility);
                    log::debug!(
                        "Staged '{}' (compatibility {:.3}, crossfade at {:.1}%)",
                        next.name,
                        compatibility,
                        start_ratio * 100.0
                    );
                    self.emit(PlayerEvent::NextStaged {
                        position: next_position,
                        track: index,
                        name: next.name.clone(),
                        compatibility,
                        start_ratio,
                    });
                    return Some((next_position, start_ratio));
                }
                Err(reason) => {
                    self.skip(next_position, index, next, reason, summary);
                    candidate = self.next_position(next_position, n);
                }
            }
        }
        None
    }

    /// Poll until the crossfade into the staged track has completed
    fn run_transition(
        &self,
        from: usize,
        to: usize,
        start_ratio: f64,
        engine: &mut EngineController,
        clock: &mut dyn PollClock,
    ) -> Result<Transition, PlayerError> {
        let mut triggered = false;

        loop {
            if self.stop.is_stopped() {
                return Ok(Transition::Halted);
            }

            let info = engine.playback_info();
            if info.pending {
                clock.wait(self.config.poll_interval())?;
                continue;
            }
            if !info.playing {
                return Ok(Transition::Halted);
            }

            if triggered {
                if !info.crossfading {
                    return Ok(Transition::Completed);
                }
            } else if info.progress >= start_ratio {
                if !engine.begin_crossfade() {
                    log::warn!("Staged track disappeared before the crossfade");
                    return Ok(Transition::SafetyExit);
                }
                triggered = true;
                log::debug!("Crossfade started at {:.1}%", info.progress * 100.0);
                self.emit(PlayerEvent::CrossfadeStarted { from, to });
            } else if info.remaining_secs < self.config.crossfade_exit_secs {
                log::warn!(
                    "Crossfade point {:.1}% not reached with {:.2}s left, starting next track",
                    start_ratio * 100.0,
                    info.remaining_secs
                );
                return Ok(Transition::SafetyExit);
            }

            clock.wait(self.config.poll_interval())?;
        }
    }

    /// Poll until the current track has played out
    fn wait_for_end(
        &self,
        engine: &mut EngineController,
        clock: &mut dyn PollClock,
    ) -> Result<(), PlayerError> {
        loop {
            if self.stop.is_stopped() {
                return Ok(());
            }
            let info = engine.playback_info();
            if info.pending {
                clock.wait(self.config.poll_interval())?;
                continue;
            }
            if !info.playing || info.remaining_secs < self.config.completion_epsilon_secs {
                return Ok(());
            }
            clock.wait(self.config.completion_poll())?;
        }
    }

    fn skip(
        &self,
        position: usize,
        index: usize,
        track: &TrackRecord,
        reason: String,
        summary: &mut PlaybackSummary,
    ) {
        log::warn!("Skipping '{}': {}", track.name, reason);
        summary.skipped += 1;
        self.emit(PlayerEvent::TrackSkipped {
            position,
            track: index,
            name: track.name.clone(),
            reason,
        });
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = events.send(event);
        }
    }
}
