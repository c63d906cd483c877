//! Command sequencer
//!
//! Deterministic, iteration-indexed state machine deciding which command to
//! emit on each control tick:
//!
//! | Tick                                 | Phase      | Command              |
//! |--------------------------------------|------------|----------------------|
//! | 0                                    | TakingOff  | Takeoff              |
//! | takeoff_ticks                        | TakingOff  | NotifySetpointStop   |
//! | takeoff_ticks < tick < end_ticks     | Tracking   | FullState            |
//! | end_ticks                            | Stopping   | NotifySetpointStop   |
//! | tick > end_ticks, or once complete   | Terminated | Terminate            |
//! | otherwise                            | unchanged  | None                 |
//!
//! `end_ticks = takeoff_ticks + N` for a table of N samples, so tracking
//! emits reference indices 1..N-1. The final sample, or reaching `end_ticks`
//! when ticks were skipped, sets the completion flag; only accepted commands
//! update the state.
//! Phases only move forward; a tick that would fall back to an earlier phase
//! yields `None`.

use flightcmd_core::control::ReferenceTable;
use flightcmd_core::Vec3;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::TakeoffConfig;
use crate::error::ControllerError;

/// Flight phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Nothing emitted yet
    Idle,
    TakingOff,
    Tracking,
    Stopping,
    /// Terminate emitted; terminal
    Terminated,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::TakingOff => "TakingOff",
            Phase::Tracking => "Tracking",
            Phase::Stopping => "Stopping",
            Phase::Terminated => "Terminated",
        }
    }
}

/// Mutable sequencer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerState {
    pub phase: Phase,
    /// Tick counter: last tick whose command was accepted
    pub tick: Option<u64>,
    /// Set once the final reference sample or the closing marker was emitted
    pub complete: bool,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            tick: None,
            complete: false,
        }
    }
}

/// Tick index for elapsed time, `floor(time · frequency)`
///
/// Returns `None` for negative or non-finite times.
pub fn tick_index(time: f64, frequency: f64) -> Option<u64> {
    let scaled = time * frequency;
    if scaled.is_finite() && scaled >= 0.0 {
        Some(scaled.floor() as u64)
    } else {
        None
    }
}

/// Iteration-indexed flight command state machine
#[derive(Debug, Clone)]
pub struct Sequencer {
    takeoff_ticks: u64,
    end_ticks: u64,
    takeoff_height: f64,
    takeoff_duration: f64,
    state: SequencerState,
}

impl Sequencer {
    /// Create a sequencer for a reference table of `table_len` samples
    pub fn new(
        takeoff: &TakeoffConfig,
        frequency: f64,
        table_len: usize,
    ) -> Result<Self, ControllerError> {
        takeoff.validate()?;
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(ControllerError::config(format!(
                "control frequency must be positive, got {frequency}"
            )));
        }
        if table_len == 0 {
            return Err(ControllerError::config("reference table is empty"));
        }

        let takeoff_ticks = (takeoff.time * frequency).round() as u64;
        if takeoff_ticks == 0 {
            return Err(ControllerError::config(format!(
                "takeoff time {} s is shorter than one tick at {frequency} Hz",
                takeoff.time
            )));
        }

        Ok(Self {
            takeoff_ticks,
            end_ticks: takeoff_ticks + table_len as u64,
            takeoff_height: takeoff.height,
            takeoff_duration: takeoff.command_duration(),
            state: SequencerState::default(),
        })
    }

    /// Decide the command for `tick`
    ///
    /// `correction` replaces the acceleration channel of full-state commands
    /// when given. Repeated calls with the same tick yield the same command.
    pub fn decide(
        &mut self,
        tick: u64,
        table: &ReferenceTable,
        correction: Option<&Vec3>,
    ) -> Command {
        if self.state.phase == Phase::Terminated {
            return Command::Terminate;
        }

        let (phase, command, completes) = if tick == 0 {
            (
                Phase::TakingOff,
                Command::Takeoff {
                    height: self.takeoff_height,
                    duration: self.takeoff_duration,
                },
                false,
            )
        } else if tick == self.takeoff_ticks {
            (Phase::TakingOff, Command::NotifySetpointStop, false)
        } else if tick > self.takeoff_ticks && tick < self.end_ticks {
            let (command, is_final) = self.track(tick, table, correction);
            (Phase::Tracking, command, is_final)
        } else if tick == self.end_ticks {
            (Phase::Stopping, Command::NotifySetpointStop, true)
        } else if self.state.complete || tick > self.end_ticks {
            (Phase::Terminated, Command::Terminate, true)
        } else {
            (self.state.phase, Command::None, false)
        };

        if phase < self.state.phase {
            warn!(
                tick,
                phase = self.state.phase.label(),
                requested = phase.label(),
                "Tick would revisit an earlier phase, emitting no command"
            );
            return Command::None;
        }

        if !command.is_well_formed() {
            warn!(tick, command = command.name(), "Malformed command suppressed");
            return Command::None;
        }

        if phase != self.state.phase {
            info!(
                tick,
                from = self.state.phase.label(),
                to = phase.label(),
                "Sequencer phase transition"
            );
        }
        if completes && !self.state.complete {
            debug!(tick, "Reference trajectory complete");
            self.state.complete = true;
        }
        self.state.phase = phase;
        self.state.tick = Some(tick);
        command
    }

    /// Full-state command for a tracking tick, and whether it carries the final sample
    fn track(
        &self,
        tick: u64,
        table: &ReferenceTable,
        correction: Option<&Vec3>,
    ) -> (Command, bool) {
        let step = ((tick - self.takeoff_ticks) as usize).min(table.last_index());
        let sample = table.get(step);

        let acceleration = correction.copied().unwrap_or(sample.acceleration);
        let command = Command::FullState {
            position: sample.position,
            velocity: sample.velocity,
            acceleration,
            yaw: sample.yaw,
            body_rates: Vec3::zeros(),
        };
        (command, step == table.last_index())
    }

    /// Tick at which tracking hands over from takeoff
    pub fn takeoff_ticks(&self) -> u64 {
        self.takeoff_ticks
    }

    /// Tick of the closing setpoint-stop marker
    pub fn end_ticks(&self) -> u64 {
        self.end_ticks
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Last tick whose command was accepted
    pub fn last_tick(&self) -> Option<u64> {
        self.state.tick
    }

    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Restart from Idle
    pub fn reset(&mut self) {
        self.state = SequencerState::default();
    }
}
