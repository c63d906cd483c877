//! Point-Mass Flight Demonstration
//!
//! Flies the default sinusoidal reference with a PD-tracked double integrator
//! subject to a constant unmodelled acceleration, once with the learned
//! feed-forward correction and once without, and compares tracking errors.
//!
//! Run with `RUST_LOG=debug` to see phase transitions and learner events.

use flightcmd_controller::info::{GateDimensions, GateSize};
use flightcmd_controller::telemetry::init_tracing;
use flightcmd_controller::{
    Command, ControlMode, Controller, ControllerConfig, ControllerError, InfoMap, InitialInfo,
};
use flightcmd_core::{Action, Observation, ObservationVector, Vec3};

const CTRL_FREQ: f64 = 30.0;
const SUBSTEPS: usize = 10;

/// Double integrator tracking setpoints with a PD law
struct PointMass {
    position: Vec3,
    velocity: Vec3,
    /// Acceleration the tracking law does not know about [m/s²]
    disturbance: Vec3,
    kp: f64,
    kd: f64,
}

impl PointMass {
    fn observation(&self) -> Observation {
        let mut raw = ObservationVector::zeros();
        for axis in 0..3 {
            raw[2 * axis] = self.position[axis];
            raw[2 * axis + 1] = self.velocity[axis];
        }
        Observation::new(raw)
    }

    /// Advance one control period following `target`
    fn step(&mut self, target: &Vec3, target_velocity: &Vec3, feed_forward: &Vec3) -> Action {
        let dt = 1.0 / (CTRL_FREQ * SUBSTEPS as f64);
        let mut commanded = Vec3::zeros();
        for _ in 0..SUBSTEPS {
            commanded = (target - self.position) * self.kp
                + (target_velocity - self.velocity) * self.kd
                + feed_forward;
            let acceleration = commanded + self.disturbance;
            self.velocity += acceleration * dt;
            self.position += self.velocity * dt;
        }
        // Collective thrust proxy per rotor
        Action::repeat((commanded.z + 9.81).max(0.0) * 0.027 / 4.0)
    }
}

struct FlightSummary {
    ticks: u64,
    rms_error: f64,
    max_error: f64,
    correction: Vec3,
}

fn fly(learning_enabled: bool) -> Result<FlightSummary, ControllerError> {
    let start = Vec3::new(-1.0, -3.0, 0.03);
    let info = InitialInfo {
        gate_dimensions: Some(GateDimensions {
            tall: GateSize { height: 1.0, edge: 0.45 },
            low: Some(GateSize { height: 0.525, edge: 0.45 }),
        }),
        ..InitialInfo::with_frequency(CTRL_FREQ)
    };
    let config = ControllerConfig { learning_enabled, ..Default::default() };

    let mut quad = PointMass {
        position: start,
        velocity: Vec3::zeros(),
        disturbance: Vec3::new(0.3, -0.2, -0.4),
        kp: 6.0,
        kd: 4.0,
    };
    let mut ctrl = Controller::new(quad.observation(), info, ControlMode::Firmware, config, true)?;

    let mut hold = ctrl.start_waypoint();
    let mut squared = 0.0;
    let mut max_error: f64 = 0.0;
    let mut tracked = 0u32;
    let mut tick = 0u64;

    loop {
        let time = tick as f64 / CTRL_FREQ;
        let obs = quad.observation();
        let command = ctrl.cmd_firmware(time, &obs)?;

        let action = match &command {
            Command::Terminate => break,
            Command::Takeoff { height, .. } => {
                hold = Vec3::new(quad.position.x, quad.position.y, *height);
                quad.step(&hold, &Vec3::zeros(), &Vec3::zeros())
            }
            Command::FullState { position, velocity, acceleration, .. } => {
                hold = *position;
                let action = quad.step(position, velocity, acceleration);
                let error = (position - quad.position).norm();
                squared += error * error;
                max_error = max_error.max(error);
                tracked += 1;
                action
            }
            _ => quad.step(&hold, &Vec3::zeros(), &Vec3::zeros()),
        };

        let mut info = InfoMap::new();
        info.insert("time".into(), serde_json::json!(time));
        let reward = -(hold - quad.position).norm();
        ctrl.on_step_learn(&command, action, quad.observation(), reward, false, info);
        tick += 1;
    }
    ctrl.on_episode_learn();

    println!(
        "  step learning: {}\n  episode learning: {}",
        ctrl.timing().step,
        ctrl.timing().episode
    );

    Ok(FlightSummary {
        ticks: tick,
        rms_error: (squared / f64::from(tracked.max(1))).sqrt(),
        max_error,
        correction: ctrl.correction(),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(false)?;

    println!("=== Point-Mass Flight Demonstration ===\n");

    for learning in [false, true] {
        println!("Learning {}:", if learning { "enabled" } else { "disabled" });
        let summary = fly(learning)?;
        println!(
            "  {} ticks, RMS error {:.4} m, max error {:.4} m",
            summary.ticks, summary.rms_error, summary.max_error
        );
        println!(
            "  final correction [{:.3}, {:.3}, {:.3}] m/s²\n",
            summary.correction.x, summary.correction.y, summary.correction.z
        );
    }

    Ok(())
}
