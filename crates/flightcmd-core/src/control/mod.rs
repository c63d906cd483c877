//! Reference generation for the flight-command sequencer
//!
//! - Reference trajectory table (precomputed position/velocity/acceleration per tick)

pub mod trajectory;

pub use trajectory::*;
