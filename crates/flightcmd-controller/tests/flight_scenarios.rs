//! End-to-end flight scenarios
//!
//! Drives the controller tick by tick the way the actuation loop does:
//! command, external plant step, learning hook.

use approx::assert_relative_eq;

use flightcmd_controller::info::{GateDimensions, GateSize};
use flightcmd_controller::{
    Command, ControlMode, Controller, ControllerConfig, ControllerError, InfoMap, InitialInfo,
    Phase,
};
use flightcmd_core::{Action, Observation, Vec3};

const FREQ: f64 = 30.0;

fn firmware_info() -> InitialInfo {
    InitialInfo {
        gate_dimensions: Some(GateDimensions {
            tall: GateSize { height: 1.0, edge: 0.45 },
            low: Some(GateSize { height: 0.525, edge: 0.45 }),
        }),
        ..InitialInfo::with_frequency(FREQ)
    }
}

/// Mid-tick time, safe against floor rounding
fn time_of(tick: u64) -> f64 {
    (tick as f64 + 0.5) / FREQ
}

mod sequencing_tests {
    use super::*;

    #[test]
    fn test_full_firmware_episode() {
        let obs = Observation::at_rest(Vec3::new(0.0, 0.0, 1.0));
        let mut ctrl =
            Controller::new(obs, firmware_info(), ControlMode::Firmware, Default::default(), true)
                .unwrap();
        assert_eq!(ctrl.reference().len(), 450);

        match ctrl.cmd_firmware(0.0, &obs).unwrap() {
            Command::Takeoff { height, duration } => {
                assert_relative_eq!(height, 1.0);
                assert_relative_eq!(duration, 0.8, epsilon = 1e-12);
            }
            other => panic!("expected takeoff, got {other:?}"),
        }

        for tick in 1..30 {
            assert_eq!(ctrl.cmd_firmware(time_of(tick), &obs).unwrap(), Command::None);
        }
        assert_eq!(ctrl.cmd_firmware(1.0, &obs).unwrap(), Command::NotifySetpointStop);

        let first = ctrl.cmd_firmware(time_of(31), &obs).unwrap();
        assert_eq!(first.full_state_position(), Some(ctrl.reference().get(1).position));
        assert_eq!(ctrl.phase(), Phase::Tracking);

        for tick in 32..479 {
            let cmd = ctrl.cmd_firmware(time_of(tick), &obs).unwrap();
            assert_eq!(cmd.code(), 1, "tick {tick}");
            assert!(!ctrl.sequencer().is_complete(), "tick {tick}");
        }

        let last = ctrl.cmd_firmware(time_of(479), &obs).unwrap();
        assert_eq!(last.full_state_position(), Some(ctrl.reference().get(449).position));
        assert!(ctrl.sequencer().is_complete());

        assert_eq!(ctrl.cmd_firmware(time_of(480), &obs).unwrap(), Command::NotifySetpointStop);
        assert_eq!(ctrl.cmd_firmware(time_of(481), &obs).unwrap(), Command::Terminate);
        assert_eq!(ctrl.phase(), Phase::Terminated);
        assert_eq!(ctrl.cmd_firmware(time_of(482), &obs).unwrap(), Command::Terminate);
    }

    #[test]
    fn test_jittery_loop_skipping_final_tick_terminates() {
        let obs = Observation::at_rest(Vec3::new(0.0, 0.0, 1.0));
        let mut ctrl =
            Controller::new(obs, firmware_info(), ControlMode::Firmware, Default::default(), false)
                .unwrap();

        let mut last = Command::None;
        for tick in (0..700).filter(|&t| t != 479) {
            let cmd = ctrl.cmd_firmware(time_of(tick), &obs).unwrap();
            match tick {
                480 => assert_eq!(cmd, Command::NotifySetpointStop),
                t if t > 480 => assert!(cmd.is_terminate(), "tick {tick}: {cmd:?}"),
                _ => {}
            }
            last = cmd;
        }
        assert!(last.is_terminate());
        assert_eq!(ctrl.phase(), Phase::Terminated);
        assert!(ctrl.sequencer().is_complete());
    }

    #[test]
    fn test_repeated_queries_within_a_tick() {
        let obs = Observation::at_rest(Vec3::zeros());
        let mut ctrl =
            Controller::new(obs, firmware_info(), ControlMode::Firmware, Default::default(), false)
                .unwrap();

        for tick in 0..100 {
            let early = ctrl.cmd_firmware(tick as f64 / FREQ + 0.001, &obs).unwrap();
            let late = ctrl.cmd_firmware(time_of(tick), &obs).unwrap();
            assert_eq!(early, late, "tick {tick}");
        }
    }

    #[test]
    fn test_only_documented_commands_emitted() {
        let obs = Observation::at_rest(Vec3::zeros());
        let mut ctrl =
            Controller::new(obs, firmware_info(), ControlMode::Firmware, Default::default(), false)
                .unwrap();

        let mut codes = Vec::new();
        for tick in 0..600 {
            let cmd = ctrl.cmd_firmware(time_of(tick), &obs).unwrap();
            assert!(cmd.is_well_formed());
            codes.push(cmd.code());
        }
        assert!(codes.iter().all(|c| [-1, 0, 1, 2, 6].contains(c)));
        assert_eq!(codes.iter().filter(|&&c| c == 2).count(), 1);
        assert_eq!(codes.iter().filter(|&&c| c == 6).count(), 2);
        assert_eq!(codes.iter().filter(|&&c| c == 1).count(), 449);
    }
}

mod mode_tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "ctrl_timestep": 0.03333333333333333,
        "ctrl_freq": 30,
        "nominal_gates_pos_and_type": [
            [0.5, -2.5, 0, 0, 0, -1.57, 0],
            [2.0, -1.5, 0, 0, 0, 0, 1]
        ],
        "nominal_obstacles_pos": [[1.5, -2.5, 0, 0, 0, 0]],
        "quadrotor_kf": 3.16e-10,
        "gate_dimensions": {"tall": {"height": 1.0, "edge": 0.45}}
    }"#;

    #[test]
    fn test_json_configured_sim_only_flight() {
        let info = InitialInfo::from_json(SCENARIO).unwrap();
        let config: ControllerConfig = serde_json::from_str(
            r#"{
                "flight_duration": 5.0,
                "takeoff": {"time": 1.0, "height": 1.0, "margin": 0.2},
                "path": {"kind": "hover", "height": 1.5},
                "krls": {
                    "num_taps": 30, "delta": 0.01, "lambda": 0.99,
                    "kernel": {"kind": "polynomial", "c": 1.0, "degree": 5},
                    "normalize_kernel": true, "gain": 0.05, "max_correction": 2.0
                },
                "learning_enabled": true,
                "buffer_size": 50
            }"#,
        )
        .unwrap();

        let obs = Observation::at_rest(Vec3::new(-1.0, -3.0, 0.03));
        let ctrl = Controller::new(obs, info, ControlMode::SimulationOnly, config, false).unwrap();
        assert_eq!(ctrl.reference().len(), 150);
        assert_eq!(ctrl.start_waypoint(), Vec3::new(-1.0, -3.0, 0.03));

        for tick in 0..200 {
            let target = ctrl.cmd_sim_only(time_of(tick), &obs).unwrap();
            assert_eq!(target.position, Vec3::new(-1.0, -3.0, 1.5));
            assert_eq!(target.velocity, Vec3::zeros());
        }
    }

    #[test]
    fn test_mode_mismatch_fails_fast() {
        let info = InitialInfo::from_json(SCENARIO).unwrap();
        let obs = Observation::at_rest(Vec3::zeros());

        let mut sim = Controller::new(
            obs,
            info.clone(),
            ControlMode::SimulationOnly,
            Default::default(),
            false,
        )
        .unwrap();
        let err = sim.cmd_firmware(0.0, &obs).unwrap_err();
        assert!(matches!(err, ControllerError::PreconditionViolation(_)));
        assert!(!err.is_configuration());

        let firmware =
            Controller::new(obs, info, ControlMode::Firmware, Default::default(), false).unwrap();
        assert!(matches!(
            firmware.cmd_sim_only(0.0, &obs),
            Err(ControllerError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_missing_mode_hints_rejected() {
        let obs = Observation::at_rest(Vec3::zeros());
        let bare = InitialInfo::with_frequency(FREQ);

        for mode in [ControlMode::Firmware, ControlMode::SimulationOnly] {
            let err = Controller::new(obs, bare.clone(), mode, Default::default(), false)
                .unwrap_err();
            assert!(err.is_configuration(), "{mode:?}");
        }
    }
}

mod learning_tests {
    use super::*;

    /// First-order tracking error model with an unmodelled acceleration
    struct ErrorPlant {
        error: Vec3,
        disturbance: Vec3,
    }

    impl ErrorPlant {
        fn step(&mut self, acceleration: &Vec3) {
            self.error = self.error * 0.9 + (self.disturbance - acceleration) * 0.02;
        }
    }

    #[test]
    fn test_learning_loop_stays_bounded() {
        let start = Vec3::new(0.0, 0.0, 1.0);
        let obs = Observation::at_rest(start);
        let mut ctrl =
            Controller::new(obs, firmware_info(), ControlMode::Firmware, Default::default(), false)
                .unwrap();

        let mut plant = ErrorPlant {
            error: Vec3::zeros(),
            disturbance: Vec3::new(0.4, -0.2, 0.6),
        };
        let mut reference = start;
        let mut obs = obs;
        let mut ticks = 0;

        loop {
            let cmd = ctrl.cmd_firmware(time_of(ticks), &obs).unwrap();
            if cmd.is_terminate() {
                break;
            }
            if let (Some(position), Some(acceleration)) =
                (cmd.full_state_position(), cmd.full_state_acceleration())
            {
                plant.step(&acceleration);
                reference = position;
            }
            obs = Observation::at_rest(reference - plant.error);

            let mut info = InfoMap::new();
            info.insert("tick".into(), serde_json::json!(ticks));
            let correction =
                ctrl.on_step_learn(&cmd, Action::repeat(0.08), obs, -plant.error.norm(), false, info);

            assert!(correction.iter().all(|v| v.is_finite()), "tick {ticks}");
            assert!(correction.amax() <= 2.0 + 1e-12, "tick {ticks}");
            assert!(plant.error.norm() < 1.0, "tick {ticks}");
            ticks += 1;
        }

        assert_eq!(ticks, 481);
        assert_eq!(ctrl.interstep_counter(), 481);
        assert_eq!(ctrl.history().len(), 100);
        assert_eq!(ctrl.learner().degradations(), 0);
        assert_eq!(ctrl.learner().updates(), 448);
        assert!(ctrl.correction().dot(&plant.disturbance) > 0.0);

        let latest = ctrl.history().last().unwrap();
        assert_eq!(latest.info["tick"], serde_json::json!(480));
        assert_eq!(latest.commanded_reference, reference);

        ctrl.on_episode_learn();
        assert_eq!(ctrl.interepisode_counter(), 1);
        assert_eq!(ctrl.timing().step.count(), 481);
    }

    #[test]
    fn test_reset_starts_a_fresh_episode() {
        let obs = Observation::at_rest(Vec3::zeros());
        let mut ctrl =
            Controller::new(obs, firmware_info(), ControlMode::Firmware, Default::default(), false)
                .unwrap();

        for tick in 0..60 {
            let cmd = ctrl.cmd_firmware(time_of(tick), &obs).unwrap();
            ctrl.on_step_learn(&cmd, Action::zeros(), obs, 0.0, false, InfoMap::new());
        }
        assert_eq!(ctrl.phase(), Phase::Tracking);

        ctrl.reset();
        ctrl.inter_episode_reset();
        assert!(ctrl.history().is_empty());
        assert_eq!(ctrl.learner().updates(), 0);
        assert_eq!(ctrl.timing().step.count(), 0);
        assert!(matches!(
            ctrl.cmd_firmware(0.0, &obs).unwrap(),
            Command::Takeoff { .. }
        ));
    }
}
