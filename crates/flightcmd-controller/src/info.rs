//! A priori scenario information
//!
//! Everything the environment tells the controller before the first tick:
//! control timing, nominal gate/obstacle geometry and, depending on the
//! control mode, vehicle or scenario hints.

use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Opaque per-tick information map
pub type InfoMap = serde_json::Map<String, serde_json::Value>;

/// Gate dimensions for one gate type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSize {
    /// Height of the gate centre above ground [m]
    pub height: f64,
    /// Edge length of the opening [m]
    #[serde(default)]
    pub edge: f64,
}

/// Dimensions of the gate types in the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDimensions {
    pub tall: GateSize,
    pub low: Option<GateSize>,
}

/// Information available at construction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialInfo {
    /// Control period [s]
    pub ctrl_timestep: f64,
    /// Control frequency [Hz]
    pub ctrl_freq: f64,
    /// Nominal gates: [x, y, z, roll, pitch, yaw, type]
    pub nominal_gates_pos_and_type: Vec<[f64; 7]>,
    /// Nominal obstacles: [x, y, z, roll, pitch, yaw]
    pub nominal_obstacles_pos: Vec<[f64; 6]>,
    /// Thrust coefficient of the quadrotor [N/(rad/s)²]
    #[serde(default)]
    pub quadrotor_kf: Option<f64>,
    #[serde(default)]
    pub gate_dimensions: Option<GateDimensions>,
}

impl InitialInfo {
    /// Minimal info for a given control frequency
    pub fn with_frequency(ctrl_freq: f64) -> Self {
        Self {
            ctrl_timestep: 1.0 / ctrl_freq,
            ctrl_freq,
            nominal_gates_pos_and_type: Vec::new(),
            nominal_obstacles_pos: Vec::new(),
            quadrotor_kf: None,
            gate_dimensions: None,
        }
    }

    /// Parse from a JSON document
    pub fn from_json(json: &str) -> Result<Self, ControllerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Height of the tall gate, if provided
    pub fn tall_gate_height(&self) -> Option<f64> {
        self.gate_dimensions.as_ref().map(|d| d.tall.height)
    }

    /// Check control timing and the mode-specific hints
    ///
    /// Firmware mode needs the tall gate height; simulation-only mode needs the
    /// thrust coefficient of the software controller.
    pub fn validate(&self, firmware: bool) -> Result<(), ControllerError> {
        if !(self.ctrl_freq.is_finite() && self.ctrl_freq > 0.0) {
            return Err(ControllerError::config(format!(
                "control frequency must be positive, got {}",
                self.ctrl_freq
            )));
        }
        if !(self.ctrl_timestep.is_finite() && self.ctrl_timestep > 0.0) {
            return Err(ControllerError::config(format!(
                "control timestep must be positive, got {}",
                self.ctrl_timestep
            )));
        }
        if (self.ctrl_timestep * self.ctrl_freq - 1.0).abs() > 1e-3 {
            return Err(ControllerError::config(format!(
                "control timestep {} s does not match frequency {} Hz",
                self.ctrl_timestep, self.ctrl_freq
            )));
        }

        if firmware {
            match self.tall_gate_height() {
                Some(h) if h.is_finite() && h > 0.0 => {}
                _ => {
                    return Err(ControllerError::config(
                        "firmware mode requires a positive tall gate height",
                    ))
                }
            }
        } else {
            match self.quadrotor_kf {
                Some(kf) if kf.is_finite() && kf > 0.0 => {}
                _ => {
                    return Err(ControllerError::config(
                        "simulation-only mode requires a positive thrust coefficient",
                    ))
                }
            }
        }
        Ok(())
    }
}
