//! # flightcmd-core
//!
//! Leaf algorithms behind the quadrotor flight-command sequencer.
//!
//! ## Modules
//!
//! - [`math`]: Kernel functions for the adaptive estimator
//! - [`estimation`]: Kernel recursive least squares (KRLS) acceleration correction
//! - [`control`]: Precomputed reference trajectory table
//! - [`history`]: Fixed-capacity tick history buffers

pub mod error;
pub mod math;
pub mod estimation;
pub mod control;
pub mod history;

pub use error::CoreError;

use nalgebra::{SVector, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// Rotor/thrust action applied during one tick
pub type Action = Vector4<f64>;

/// Raw 12-element observation vector
///
/// Layout: [x, ẋ, y, ẏ, z, ż, φ, θ, ψ, p, q, r]
pub type ObservationVector = SVector<f64, 12>;

/// Quadrotor state observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation(pub ObservationVector);

impl Default for Observation {
    fn default() -> Self {
        Self(ObservationVector::zeros())
    }
}

impl Observation {
    /// Wrap a raw observation vector
    pub fn new(raw: ObservationVector) -> Self {
        Self(raw)
    }

    /// Build an observation at rest at the given position
    pub fn at_rest(position: Vec3) -> Self {
        let mut raw = ObservationVector::zeros();
        raw[0] = position.x;
        raw[2] = position.y;
        raw[4] = position.z;
        Self(raw)
    }

    /// Position [m]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.0[0], self.0[2], self.0[4])
    }

    /// Velocity [m/s]
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.0[1], self.0[3], self.0[5])
    }

    /// Roll, pitch, yaw [rad]
    pub fn attitude(&self) -> Vec3 {
        Vec3::new(self.0[6], self.0[7], self.0[8])
    }

    /// Body rates [rad/s]
    pub fn body_rates(&self) -> Vec3 {
        Vec3::new(self.0[9], self.0[10], self.0[11])
    }

    /// True when every component is finite
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}
