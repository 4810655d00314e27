//! Control/render split of the crossfade engine
//!
//! ```text
//! control thread                         render thread
//! EngineController ── rtrb commands ──▶ EngineRenderer (owns CrossfadeEngine)
//!        ◀──────────── EngineAtomics ───────────┘
//! ```
//!
//! Neither side ever waits on the other. Commands are applied at the start of
//! the next rendered block; status is published through atomics after every
//! block, so polling never interrupts rendering.

use super::buffer::TrackBuffer;
use super::command::{command_channel, EngineCommand};
use super::crossfade::{CrossfadeEngine, CrossfadeState, PlaybackInfo};
use super::error::{EngineError, EngineResult};
use crate::types::StereoSample;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Render-side state published for the control thread
pub struct EngineAtomics {
    /// 0=Idle, 1=Playing, 2=Crossfading
    state: AtomicU8,
    /// Read position in the current track, in frames
    cursor: AtomicU64,
    /// Current track length in frames
    length: AtomicU64,
    next_staged: AtomicBool,
    /// Serial of the buffer now playing (0 when idle)
    current_serial: AtomicU64,
    /// Commands applied so far
    applied: AtomicU64,
}

impl EngineAtomics {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
            cursor: AtomicU64::new(0),
            length: AtomicU64::new(0),
            next_staged: AtomicBool::new(false),
            current_serial: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> CrossfadeState {
        match self.state.load(Ordering::Relaxed) {
            1 => CrossfadeState::Playing,
            2 => CrossfadeState::Crossfading,
            _ => CrossfadeState::Idle,
        }
    }

    /// Read position in the current track (lock-free)
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Acquire)
    }
}

/// Split an engine into its control and render halves
pub fn engine_channel(engine: CrossfadeEngine) -> (EngineController, EngineRenderer) {
    let (producer, consumer) = command_channel();
    let atomics = Arc::new(EngineAtomics::new());
    let sample_rate = engine.sample_rate();

    let controller = EngineController {
        commands: producer,
        atomics: Arc::clone(&atomics),
        sample_rate,
        sent: 0,
        serials: 0,
        active: false,
        next_pending: false,
        current: None,
        staged: None,
    };
    let renderer = EngineRenderer {
        engine,
        commands: consumer,
        atomics,
        applied: 0,
        current_serial: 0,
        next_serial: 0,
    };
    (controller, renderer)
}

/// Control half: validates and queues commands, reads published status
///
/// Validation happens here, before a buffer is queued, so the render thread
/// never rejects a command.
pub struct EngineController {
    commands: rtrb::Producer<EngineCommand>,
    atomics: Arc<EngineAtomics>,
    sample_rate: u32,
    /// Commands pushed so far
    sent: u64,
    /// Last serial handed to a buffer
    serials: u64,
    /// A track has been started and not stopped
    active: bool,
    /// A staged track is waiting for `begin_crossfade`
    next_pending: bool,
    current: Option<(u64, String)>,
    staged: Option<(u64, String)>,
}

impl EngineController {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Start `buffer` from the top on the next block
    pub fn play_track(&mut self, buffer: TrackBuffer) -> EngineResult<()> {
        self.check_buffer(&buffer)?;
        let serial = self.next_serial();
        let id = buffer.id().to_string();
        self.send(EngineCommand::PlayTrack { buffer, serial })?;

        self.active = true;
        self.next_pending = false;
        self.current = Some((serial, id));
        self.staged = None;
        Ok(())
    }

    /// Stage the track to crossfade into
    pub fn stage_next(&mut self, buffer: TrackBuffer) -> EngineResult<()> {
        if !self.active {
            return Err(EngineError::NotPlaying);
        }
        self.check_buffer(&buffer)?;
        self.promote_finished_crossfade();
        let serial = self.next_serial();
        let id = buffer.id().to_string();
        self.send(EngineCommand::StageNext { buffer, serial })?;

        self.next_pending = true;
        self.staged = Some((serial, id));
        Ok(())
    }

    /// Queue the crossfade into the staged track
    ///
    /// Returns false, queuing nothing, when no staged track is waiting.
    pub fn begin_crossfade(&mut self) -> bool {
        if !self.active || !self.next_pending {
            return false;
        }
        match self.send(EngineCommand::BeginCrossfade) {
            Ok(()) => {
                self.next_pending = false;
                true
            }
            Err(e) => {
                log::warn!("Crossfade not started: {}", e);
                false
            }
        }
    }

    /// Release both tracks on the next block
    pub fn stop(&mut self) {
        if let Err(e) = self.send(EngineCommand::Stop) {
            log::warn!("Stop not queued: {}", e);
        }
        self.active = false;
        self.next_pending = false;
        self.current = None;
        self.staged = None;
    }

    /// Latest published status (lock-free)
    pub fn playback_info(&self) -> PlaybackInfo {
        let atomics = &self.atomics;
        let applied = atomics.applied();
        let serial = atomics.current_serial.load(Ordering::Relaxed);

        let mut info = PlaybackInfo::at_position(
            atomics.state(),
            atomics.cursor() as usize,
            atomics.length.load(Ordering::Relaxed) as usize,
            self.sample_rate,
            atomics.next_staged.load(Ordering::Relaxed),
            self.track_id(serial).map(str::to_string),
        );
        info.pending = applied < self.sent;
        info
    }

    /// Last published state
    pub fn state(&self) -> CrossfadeState {
        self.atomics.state()
    }

    fn check_buffer(&self, buffer: &TrackBuffer) -> EngineResult<()> {
        if buffer.is_empty() {
            return Err(EngineError::EmptyBuffer(buffer.id().to_string()));
        }
        if buffer.sample_rate() != self.sample_rate {
            return Err(EngineError::SampleRateMismatch {
                id: buffer.id().to_string(),
                expected: self.sample_rate,
                actual: buffer.sample_rate(),
            });
        }
        Ok(())
    }

    fn send(&mut self, command: EngineCommand) -> EngineResult<()> {
        match self.commands.push(command) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(rtrb::PushError::Full(_)) => Err(EngineError::QueueFull),
        }
    }

    fn next_serial(&mut self) -> u64 {
        self.serials += 1;
        self.serials
    }

    /// Once the render side plays the staged buffer, it becomes current
    fn promote_finished_crossfade(&mut self) {
        let serial = self.atomics.current_serial.load(Ordering::Relaxed);
        if matches!(&self.staged, Some((staged, _)) if *staged == serial) {
            self.current = self.staged.take();
        }
    }

    fn track_id(&self, serial: u64) -> Option<&str> {
        if serial == 0 {
            return None;
        }
        [&self.current, &self.staged]
            .into_iter()
            .flatten()
            .find(|(s, _)| *s == serial)
            .map(|(_, id)| id.as_str())
    }
}

/// Render half: owns the engine, applies queued commands, publishes status
pub struct EngineRenderer {
    engine: CrossfadeEngine,
    commands: rtrb::Consumer<EngineCommand>,
    atomics: Arc<EngineAtomics>,
    applied: u64,
    current_serial: u64,
    next_serial: u64,
}

impl EngineRenderer {
    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    pub fn engine(&self) -> &CrossfadeEngine {
        &self.engine
    }

    /// Apply every queued command and publish the result (real-time safe)
    pub fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::PlayTrack { buffer, serial } => {
                    if self.engine.play_track(buffer).is_ok() {
                        self.current_serial = serial;
                        self.next_serial = 0;
                    }
                }
                EngineCommand::StageNext { buffer, serial } => {
                    if self.engine.stage_next(buffer).is_ok() {
                        self.next_serial = serial;
                    }
                }
                EngineCommand::BeginCrossfade => {
                    self.engine.begin_crossfade();
                }
                EngineCommand::Stop => {
                    self.engine.stop();
                    self.current_serial = 0;
                    self.next_serial = 0;
                }
            }
            self.applied += 1;
        }
        self.publish();
    }

    /// Render one block for the audio callback (never blocks)
    pub fn render_into(&mut self, out: &mut [StereoSample]) {
        self.process_commands();

        let was_crossfading = self.engine.state() == CrossfadeState::Crossfading;
        self.engine.render_into(out);
        if was_crossfading && self.engine.state() != CrossfadeState::Crossfading {
            self.current_serial = std::mem::take(&mut self.next_serial);
        }

        self.publish();
    }

    fn publish(&self) {
        let atomics = &self.atomics;
        let state = match self.engine.state() {
            CrossfadeState::Idle => 0,
            CrossfadeState::Playing => 1,
            CrossfadeState::Crossfading => 2,
        };
        let length = self.engine.current().map_or(0, |b| b.len());

        atomics.state.store(state, Ordering::Relaxed);
        atomics.cursor.store(self.engine.cursor() as u64, Ordering::Relaxed);
        atomics.length.store(length as u64, Ordering::Relaxed);
        atomics
            .next_staged
            .store(self.engine.next().is_some(), Ordering::Relaxed);
        atomics
            .current_serial
            .store(self.current_serial, Ordering::Relaxed);
        atomics.applied.store(self.applied, Ordering::Release);
    }
}
