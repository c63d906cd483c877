//! Online estimation for feed-forward compensation
//!
//! - Kernel recursive least squares (sliding window, multi-output) learning the
//!   acceleration correction that drives observed position toward the reference

pub mod krls;

pub use krls::*;
