//! Discrete flight commands
//!
//! One variant per command kind understood by the actuation layer, with the
//! argument shape that kind expects.

use flightcmd_core::Vec3;
use serde::{Deserialize, Serialize};

/// Command emitted once per control tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// No command this tick
    #[default]
    None,
    /// Full-state setpoint
    FullState {
        /// Target position [m]
        position: Vec3,
        /// Target velocity [m/s]
        velocity: Vec3,
        /// Feed-forward acceleration [m/s²]
        acceleration: Vec3,
        /// Target yaw [rad]
        yaw: f64,
        /// Roll/pitch/yaw rates [rad/s]
        body_rates: Vec3,
    },
    /// Take off to `height` [m] over `duration` [s]
    Takeoff { height: f64, duration: f64 },
    /// Land to `height` [m] over `duration` [s]
    Land { height: f64, duration: f64 },
    /// Cut motors
    Stop,
    /// High-level go-to
    GoTo {
        position: Vec3,
        yaw: f64,
        duration: f64,
        relative: bool,
    },
    /// Stop streaming setpoints so high-level commands take over again
    NotifySetpointStop,
    /// End of episode
    Terminate,
}

impl Command {
    /// Firmware command code
    pub fn code(&self) -> i8 {
        match self {
            Command::Terminate => -1,
            Command::None => 0,
            Command::FullState { .. } => 1,
            Command::Takeoff { .. } => 2,
            Command::Land { .. } => 3,
            Command::Stop => 4,
            Command::GoTo { .. } => 5,
            Command::NotifySetpointStop => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::None => "none",
            Command::FullState { .. } => "full_state",
            Command::Takeoff { .. } => "takeoff",
            Command::Land { .. } => "land",
            Command::Stop => "stop",
            Command::GoTo { .. } => "go_to",
            Command::NotifySetpointStop => "notify_setpoint_stop",
            Command::Terminate => "terminate",
        }
    }

    /// Position channel of a full-state command
    pub fn full_state_position(&self) -> Option<Vec3> {
        match self {
            Command::FullState { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Acceleration channel of a full-state command
    pub fn full_state_acceleration(&self) -> Option<Vec3> {
        match self {
            Command::FullState { acceleration, .. } => Some(*acceleration),
            _ => None,
        }
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Command::Terminate)
    }

    /// True when every numeric argument is finite
    pub fn is_well_formed(&self) -> bool {
        let finite = |v: &Vec3| v.iter().all(|x| x.is_finite());
        match self {
            Command::FullState { position, velocity, acceleration, yaw, body_rates } => {
                finite(position)
                    && finite(velocity)
                    && finite(acceleration)
                    && yaw.is_finite()
                    && finite(body_rates)
            }
            Command::Takeoff { height, duration } | Command::Land { height, duration } => {
                height.is_finite() && duration.is_finite() && *duration >= 0.0
            }
            Command::GoTo { position, yaw, duration, .. } => {
                finite(position) && yaw.is_finite() && duration.is_finite() && *duration >= 0.0
            }
            Command::None | Command::Stop | Command::NotifySetpointStop | Command::Terminate => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::Terminate.code(), -1);
        assert_eq!(Command::None.code(), 0);
        assert_eq!(Command::Takeoff { height: 1.0, duration: 0.8 }.code(), 2);
        assert_eq!(Command::Land { height: 0.0, duration: 3.0 }.code(), 3);
        assert_eq!(Command::Stop.code(), 4);
        assert_eq!(Command::NotifySetpointStop.code(), 6);
    }

    #[test]
    fn test_full_state_channels() {
        let cmd = Command::FullState {
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::zeros(),
            acceleration: Vec3::new(0.1, 0.0, -0.1),
            yaw: 0.0,
            body_rates: Vec3::zeros(),
        };
        assert_eq!(cmd.code(), 1);
        assert_eq!(cmd.full_state_position(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(cmd.full_state_acceleration(), Some(Vec3::new(0.1, 0.0, -0.1)));
        assert_eq!(Command::Stop.full_state_position(), None);
    }

    #[test]
    fn test_well_formed() {
        let bad = Command::FullState {
            position: Vec3::new(f64::NAN, 0.0, 1.0),
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            yaw: 0.0,
            body_rates: Vec3::zeros(),
        };
        assert!(!bad.is_well_formed());
        assert!(Command::GoTo { position: Vec3::zeros(), yaw: 0.0, duration: 0.5, relative: false }
            .is_well_formed());
        assert!(!Command::Takeoff { height: 1.0, duration: -1.0 }.is_well_formed());
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(Command::Takeoff { height: 1.0, duration: 0.8 }).unwrap();
        assert_eq!(json["type"], "takeoff");
        assert_eq!(json["height"], 1.0);
    }
}
