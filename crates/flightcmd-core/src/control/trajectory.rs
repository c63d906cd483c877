//! Reference trajectory table
//!
//! Precomputes, once per flight, the position/velocity/acceleration references
//! sampled at the control frequency. Velocity and acceleration come from
//! backward differences of consecutive samples scaled by the frequency; the
//! first sample has no predecessor so its derivatives are zero.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Vec3;

/// Single precomputed reference for one control tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSample {
    /// Position [m]
    pub position: Vector3<f64>,
    /// Velocity [m/s]
    pub velocity: Vector3<f64>,
    /// Acceleration [m/s²]
    pub acceleration: Vector3<f64>,
    /// Yaw angle [rad]
    pub yaw: f64,
    /// Tick index within the table
    pub index: usize,
}

/// Closed-form path the operator flies
///
/// Horizontal components are offset by the initial position; heights are absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathShape {
    /// x = sin(ωt) + x₀, y = cos(ωt) - 1 + y₀, z = A·sin(kωt) + h
    Sinusoid {
        omega: f64,
        z_amplitude: f64,
        z_frequency_ratio: f64,
        height: f64,
    },
    /// Constant position above the start point
    Hover { height: f64 },
    /// Horizontal circle passing through the start point
    Circle { radius: f64, omega: f64, height: f64 },
}

impl Default for PathShape {
    fn default() -> Self {
        Self::Sinusoid {
            omega: 1.5,
            z_amplitude: 0.2,
            z_frequency_ratio: 2.5,
            height: 1.0,
        }
    }
}

impl PathShape {
    /// Position at time `t` for a flight starting above `origin`
    pub fn position(&self, t: f64, origin: &Vec3) -> Vec3 {
        match *self {
            PathShape::Sinusoid { omega, z_amplitude, z_frequency_ratio, height } => Vec3::new(
                (omega * t).sin() + origin.x,
                (omega * t).cos() - 1.0 + origin.y,
                z_amplitude * (z_frequency_ratio * omega * t).sin() + height,
            ),
            PathShape::Hover { height } => Vec3::new(origin.x, origin.y, height),
            PathShape::Circle { radius, omega, height } => {
                let theta = omega * t;
                Vec3::new(
                    origin.x + radius * theta.cos() - radius,
                    origin.y + radius * theta.sin(),
                    height,
                )
            }
        }
    }
}

/// Trajectory generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Flight duration covered by the table [s]
    pub duration: f64,
    /// Control frequency [Hz]
    pub frequency: f64,
    /// Path flown during tracking
    pub path: PathShape,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            duration: 15.0,
            frequency: 30.0,
            path: PathShape::default(),
        }
    }
}

/// Immutable, 0-indexed table of per-tick references
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    frequency: f64,
    samples: Vec<ReferenceSample>,
}

impl ReferenceTable {
    /// Build the table for a configured path starting above `origin`
    pub fn generate(config: &TrajectoryConfig, origin: Vec3) -> Result<Self, CoreError> {
        let path = config.path.clone();
        Self::from_path(config.duration, config.frequency, move |t| path.position(t, &origin))
    }

    /// Build the table by sampling an arbitrary path function at every tick
    ///
    /// Tick `i` is sampled at `t = i / frequency`; the table holds
    /// `floor(duration * frequency)` samples.
    pub fn from_path<F>(duration: f64, frequency: f64, path: F) -> Result<Self, CoreError>
    where
        F: Fn(f64) -> Vec3,
    {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(CoreError::config(format!(
                "trajectory duration must be positive, got {duration}"
            )));
        }
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(CoreError::config(format!(
                "control frequency must be positive, got {frequency}"
            )));
        }

        // Small slack so that e.g. 15 s × 30 Hz never floors to 449
        let n_samples = (duration * frequency + 1e-9).floor() as usize;
        if n_samples == 0 {
            return Err(CoreError::config(format!(
                "duration {duration} s at {frequency} Hz yields no samples"
            )));
        }

        let mut samples: Vec<ReferenceSample> = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            let position = path(i as f64 / frequency);
            if !position.iter().all(|v| v.is_finite()) {
                return Err(CoreError::config(format!(
                    "path function returned a non-finite position at tick {i}"
                )));
            }

            let (velocity, acceleration) = match samples.last() {
                Some(prev) => {
                    let velocity = (position - prev.position) * frequency;
                    let acceleration = (velocity - prev.velocity) * frequency;
                    (velocity, acceleration)
                }
                None => (Vector3::zeros(), Vector3::zeros()),
            };

            samples.push(ReferenceSample {
                position,
                velocity,
                acceleration,
                yaw: 0.0,
                index: i,
            });
        }

        Ok(Self { frequency, samples })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed table
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the final sample
    pub fn last_index(&self) -> usize {
        self.samples.len() - 1
    }

    /// Sample at `index`, clamped to the table bounds
    pub fn get(&self, index: usize) -> &ReferenceSample {
        &self.samples[index.min(self.last_index())]
    }

    /// Sample for time `t` [s], clamped to the table bounds
    pub fn sample(&self, t: f64) -> &ReferenceSample {
        if !(t.is_finite() && t > 0.0) {
            return &self.samples[0];
        }
        self.get((t * self.frequency) as usize)
    }

    pub fn samples(&self) -> &[ReferenceSample] {
        &self.samples
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Duration covered by the table [s]
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.frequency
    }

    /// Axis-aligned bounds of the reference positions (min, max)
    pub fn position_bounds(&self) -> (Vec3, Vec3) {
        let first = self.samples[0].position;
        self.samples.iter().fold((first, first), |(lo, hi), s| {
            (lo.inf(&s.position), hi.sup(&s.position))
        })
    }
}
