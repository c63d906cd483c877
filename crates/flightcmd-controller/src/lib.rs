//! Flight-command sequencer
//!
//! Tick-driven command generation for a single quadrotor tracking a
//! precomputed reference, with an online KRLS feed-forward correction.
//!
//! # Architecture
//!
//! ```text
//! tick = floor(t · f_ctrl)
//!   └─ Sequencer ── ReferenceTable[min(tick - takeoff, N - 1)]
//!                 └─ acceleration ← KRLS correction (when learning)
//!   → Command → (external actuation) → on_step_learn → HistoryBuffer → KRLS
//! ```
//!
//! # Components
//!
//! - [`command`]: Discrete command set sent to the actuation layer
//! - [`info`]: A priori scenario information supplied at construction
//! - [`config`]: Controller configuration
//! - [`sequencer`]: Iteration-indexed flight phase state machine
//! - [`controller`]: Owning controller with learning hooks
//! - [`timing`]: Learning time statistics
//! - [`telemetry`]: Tracing subscriber setup

pub mod error;
pub mod command;
pub mod info;
pub mod config;
pub mod sequencer;
pub mod controller;
pub mod timing;
pub mod telemetry;

// Re-exports
pub use command::Command;
pub use config::ControllerConfig;
pub use controller::{ControlMode, Controller, SimTarget, TickRecord};
pub use error::ControllerError;
pub use info::{InfoMap, InitialInfo};
pub use sequencer::{Phase, Sequencer};
