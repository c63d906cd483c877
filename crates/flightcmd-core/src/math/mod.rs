//! Mathematical utilities
//!
//! Kernel functions used by the kernel adaptive filters.

pub mod kernel;

pub use kernel::*;
