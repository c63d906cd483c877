//! Controller configuration
//!
//! Operating constants for the flight: takeoff profile, flight duration, the
//! path flown while tracking, and the feed-forward learner.

use flightcmd_core::control::{PathShape, TrajectoryConfig};
use flightcmd_core::estimation::KrlsConfig;
use flightcmd_core::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Main controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Duration of the reference trajectory [s]
    pub flight_duration: f64,
    /// Takeoff profile
    pub takeoff: TakeoffConfig,
    /// Path flown while tracking
    pub path: PathShape,
    /// Feed-forward learner parameters
    pub krls: KrlsConfig,
    /// Replace the reference acceleration with the learned correction
    pub learning_enabled: bool,
    /// Number of ticks retained in the history buffers
    pub buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            flight_duration: 15.0,
            takeoff: TakeoffConfig::default(),
            path: PathShape::default(),
            krls: KrlsConfig::default(),
            learning_enabled: true,
            buffer_size: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ControllerError> {
        if !(self.flight_duration.is_finite() && self.flight_duration > 0.0) {
            return Err(ControllerError::config(format!(
                "flight duration must be positive, got {}",
                self.flight_duration
            )));
        }
        if self.buffer_size == 0 {
            return Err(ControllerError::config("buffer size must be at least 1"));
        }
        self.takeoff.validate()?;
        self.krls.validate()?;
        Ok(())
    }

    /// Trajectory parameters at the given control frequency
    pub fn trajectory(&self, frequency: f64) -> TrajectoryConfig {
        TrajectoryConfig {
            duration: self.flight_duration,
            frequency,
            path: self.path.clone(),
        }
    }
}

/// Takeoff profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoffConfig {
    /// Time allotted to takeoff before tracking starts [s]
    pub time: f64,
    /// Takeoff target height [m]
    pub height: f64,
    /// The takeoff command finishes this much before tracking starts [s]
    pub margin: f64,
}

impl Default for TakeoffConfig {
    fn default() -> Self {
        Self {
            time: 1.0,
            height: 1.0,
            margin: 0.2,
        }
    }
}

impl TakeoffConfig {
    /// Duration argument of the takeoff command [s]
    pub fn command_duration(&self) -> f64 {
        self.time - self.margin
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(ControllerError::config(format!(
                "takeoff height must be positive, got {}",
                self.height
            )));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(ControllerError::config(format!(
                "takeoff margin must be non-negative, got {}",
                self.margin
            )));
        }
        if !(self.time.is_finite() && self.time > self.margin) {
            return Err(ControllerError::config(format!(
                "takeoff time {} s must exceed its margin {} s",
                self.time, self.margin
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.takeoff.command_duration(), 0.8, epsilon = 1e-12);

        let trajectory = config.trajectory(30.0);
        assert_eq!(trajectory.frequency, 30.0);
        assert_eq!(trajectory.duration, 15.0);
    }

    #[test]
    fn test_invalid_values() {
        let config = ControllerConfig { flight_duration: 0.0, ..Default::default() };
        assert!(config.validate().unwrap_err().is_configuration());

        let config = ControllerConfig { buffer_size: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.takeoff.margin = 1.5;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.krls.lambda = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ControllerError::Core(flightcmd_core::CoreError::Configuration(_)))
        ));
    }

    #[test]
    fn test_serde_round_trip_keeps_path() {
        let config = ControllerConfig {
            path: PathShape::Hover { height: 1.2 },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ControllerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
