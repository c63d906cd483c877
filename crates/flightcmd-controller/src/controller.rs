//! Flight-command controller
//!
//! Owns the reference table, the sequencer, the feed-forward learner and the
//! tick history of a single vehicle. One tick is fully processed before the
//! next: `cmd_firmware` (or `cmd_sim_only`), external actuation, then
//! `on_step_learn`.

use flightcmd_core::control::ReferenceTable;
use flightcmd_core::estimation::KernelRls;
use flightcmd_core::history::{HistoryBuffer, HistoryRecord};
use flightcmd_core::{Action, Observation, Vec3};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::info::{InfoMap, InitialInfo};
use crate::sequencer::{tick_index, Phase, Sequencer};
use crate::timing::LearningTiming;

/// One recorded control tick
pub type TickRecord = HistoryRecord<InfoMap>;

/// Actuation interface the controller was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Discrete commands through the firmware interface
    Firmware,
    /// Target position/velocity for a software-only controller
    SimulationOnly,
}

/// Target handed to the software-only controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimTarget {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Single-vehicle flight-command controller
#[derive(Debug)]
pub struct Controller {
    mode: ControlMode,
    config: ControllerConfig,
    info: InitialInfo,
    initial_observation: Observation,
    start_waypoint: Vec3,
    table: ReferenceTable,
    sequencer: Sequencer,
    learner: KernelRls,
    history: HistoryBuffer<TickRecord>,
    /// Feed-forward acceleration substituted into full-state commands
    correction: Vec3,
    /// Position channel of the last full-state command
    last_reference: Vec3,
    interstep_counter: u64,
    interepisode_counter: u64,
    timing: LearningTiming,
}

impl Controller {
    /// Create a controller
    ///
    /// # Arguments
    /// * `initial_observation` - State at episode start
    /// * `info` - A priori scenario information
    /// * `mode` - Actuation interface
    /// * `config` - Operating constants
    /// * `verbose` - Log a summary of the generated reference
    pub fn new(
        initial_observation: Observation,
        info: InitialInfo,
        mode: ControlMode,
        config: ControllerConfig,
        verbose: bool,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        info.validate(mode == ControlMode::Firmware)?;
        if !initial_observation.is_finite() {
            return Err(ControllerError::config("initial observation is not finite"));
        }

        let origin = initial_observation.position();
        let table = ReferenceTable::generate(&config.trajectory(info.ctrl_freq), origin)?;
        let sequencer = Sequencer::new(&config.takeoff, info.ctrl_freq, table.len())?;
        let learner = KernelRls::new(config.krls.clone())?;
        let history = HistoryBuffer::new(config.buffer_size)?;

        let start_waypoint = match mode {
            ControlMode::Firmware => Vec3::new(
                origin.x,
                origin.y,
                info.tall_gate_height().unwrap_or(origin.z),
            ),
            ControlMode::SimulationOnly => origin,
        };

        if verbose {
            let (lo, hi) = table.position_bounds();
            info!(
                samples = table.len(),
                duration = table.duration(),
                frequency = table.frequency(),
                takeoff_ticks = sequencer.takeoff_ticks(),
                end_ticks = sequencer.end_ticks(),
                "Reference trajectory generated"
            );
            info!(
                start = ?start_waypoint.as_slice(),
                min = ?lo.as_slice(),
                max = ?hi.as_slice(),
                "Reference extents"
            );
        }

        Ok(Self {
            mode,
            config,
            info,
            initial_observation,
            start_waypoint,
            table,
            sequencer,
            learner,
            history,
            correction: Vec3::zeros(),
            last_reference: start_waypoint,
            interstep_counter: 0,
            interepisode_counter: 0,
            timing: LearningTiming::default(),
        })
    }

    /// Command for the firmware interface at elapsed `time` [s]
    ///
    /// A time that maps to no tick yields [`Command::None`].
    pub fn cmd_firmware(
        &mut self,
        time: f64,
        observation: &Observation,
    ) -> Result<Command, ControllerError> {
        if self.mode != ControlMode::Firmware {
            warn!(time, "Firmware command requested from a simulation-only controller");
            return Err(ControllerError::PreconditionViolation(
                "cmd_firmware called on a controller built for simulation-only mode".into(),
            ));
        }

        let Some(tick) = tick_index(time, self.info.ctrl_freq) else {
            warn!(time, "Elapsed time maps to no tick, emitting no command");
            return Ok(Command::None);
        };
        if !observation.is_finite() {
            debug!(tick, "Observation contains non-finite values");
        }

        let correction = self.config.learning_enabled.then_some(&self.correction);
        Ok(self.sequencer.decide(tick, &self.table, correction))
    }

    /// Target for the software-only controller at elapsed `time` [s]
    ///
    /// The target is the reference at index `min(tick, N - 1)` with zero velocity.
    pub fn cmd_sim_only(
        &self,
        time: f64,
        _observation: &Observation,
    ) -> Result<SimTarget, ControllerError> {
        if self.mode != ControlMode::SimulationOnly {
            warn!(time, "Simulation-only target requested from a firmware controller");
            return Err(ControllerError::PreconditionViolation(
                "cmd_sim_only called on a controller built for firmware mode".into(),
            ));
        }

        Ok(SimTarget {
            position: self.table.sample(time).position,
            velocity: Vec3::zeros(),
        })
    }

    /// Record the last tick and refresh the feed-forward correction
    ///
    /// The learner runs from the second call on, and only after a full-state
    /// command: its acceleration is the prior correction, the observed position
    /// is compared against the last commanded reference.
    pub fn on_step_learn(
        &mut self,
        last_command: &Command,
        action: Action,
        observation: Observation,
        reward: f64,
        done: bool,
        info: InfoMap,
    ) -> Vec3 {
        let timing = &mut self.timing;
        timing.time_step(|| {
            self.interstep_counter += 1;
            if let Some(position) = last_command.full_state_position() {
                self.last_reference = position;
            }

            self.history.append(HistoryRecord {
                action,
                observation,
                reward,
                done,
                info,
                commanded_reference: self.last_reference,
            });

            if self.interstep_counter > 1 {
                if let Some(prior) = last_command.full_state_acceleration() {
                    self.correction = self.learner.update(
                        &prior,
                        &observation.position(),
                        &self.last_reference,
                    );
                }
            }
            self.correction
        })
    }

    /// Episode boundary hook
    pub fn on_episode_learn(&mut self) {
        let timing = &mut self.timing;
        timing.time_episode(|| {
            self.interepisode_counter += 1;
            info!(
                episode = self.interepisode_counter,
                steps = self.interstep_counter,
                recorded = self.history.len(),
                updates = self.learner.updates(),
                degradations = self.learner.degradations(),
                "Episode learning"
            );
        });
    }

    /// Clear buffers, counters, learner and sequencer for a fresh episode
    pub fn reset(&mut self) {
        self.history.clear();
        self.interstep_counter = 0;
        self.interepisode_counter = 0;
        self.learner.reset();
        self.correction = Vec3::zeros();
        self.last_reference = self.start_waypoint;
        self.sequencer.reset();
        debug!("Controller reset");
    }

    /// Clear learning time statistics
    pub fn inter_episode_reset(&mut self) {
        self.timing.reset();
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn info(&self) -> &InitialInfo {
        &self.info
    }

    pub fn initial_observation(&self) -> &Observation {
        &self.initial_observation
    }

    /// First waypoint of the flight
    ///
    /// Firmware mode flies at the tall gate height; simulation-only mode starts
    /// from the initial observed position.
    pub fn start_waypoint(&self) -> Vec3 {
        self.start_waypoint
    }

    pub fn reference(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    /// Current feed-forward correction [m/s²]
    pub fn correction(&self) -> Vec3 {
        self.correction
    }

    pub fn learner(&self) -> &KernelRls {
        &self.learner
    }

    pub fn history(&self) -> &HistoryBuffer<TickRecord> {
        &self.history
    }

    pub fn interstep_counter(&self) -> u64 {
        self.interstep_counter
    }

    pub fn interepisode_counter(&self) -> u64 {
        self.interepisode_counter
    }

    pub fn timing(&self) -> &LearningTiming {
        &self.timing
    }
}
