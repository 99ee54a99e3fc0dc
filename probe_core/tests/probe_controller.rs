use probe_core::error::{ProbeError, ScriptKind};
use probe_core::mocks::{FixedToolhead, NoopScript};
use probe_core::{
    AccelEndstop, ActivationScripts, HomingEndstop, HomingMove, InitSequence, ProbeCfg,
    ProbeController, ProbeState,
};
use probe_hardware::{SimAccel, SimBoard, SimDispatch, SimKinematics, SimScript, SimStepper, SimToolhead};
use probe_traits::{Board, Stepper, Toolhead};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const HMOVE: HomingMove = HomingMove {
    print_time: 1.0,
    end_time: 3.0,
};

fn endstop(board: Arc<SimBoard>) -> AccelEndstop {
    AccelEndstop::builder()
        .with_board(board)
        .with_sensor(SimAccel::new("adxl345", 1000, 1))
        .with_dispatch(SimDispatch::new())
        .build()
        .expect("endstop builds")
}

struct Counted {
    probe: ProbeController<AccelEndstop>,
    deploys: Arc<AtomicUsize>,
    retracts: Arc<AtomicUsize>,
}

fn counted(deactivate_on_each_sample: bool, activate: &str, deactivate: &str) -> (Counted, Arc<SimToolhead>) {
    let toolhead = Arc::new(SimToolhead::new([10.0, 20.0, 5.0, 0.0]));
    let act = SimScript::new("activate_gcode", activate, toolhead.clone());
    let deact = SimScript::new("deactivate_gcode", deactivate, toolhead.clone());
    let deploys = act.run_counter();
    let retracts = deact.run_counter();
    let probe = ProbeController::new(
        endstop(Arc::new(SimBoard::new("mcu", 16_000_000.0))),
        ProbeCfg {
            z_offset: 1.25,
            deactivate_on_each_sample,
        },
        toolhead.clone(),
        ActivationScripts {
            activate: Box::new(act),
            deactivate: Box::new(deact),
        },
    );
    (
        Counted {
            probe,
            deploys,
            retracts,
        },
        toolhead,
    )
}

fn counts(c: &Counted) -> (usize, usize) {
    (
        c.deploys.load(Ordering::Relaxed),
        c.retracts.load(Ordering::Relaxed),
    )
}

#[test]
fn deploy_and_retract_every_sample_by_default() {
    let (mut c, _) = counted(true, "M280 P0 S10", "M280 P0 S90");
    c.probe.multi_probe_begin();
    assert_eq!(c.probe.state(), ProbeState::Off);
    for _ in 0..3 {
        c.probe.probe_prepare(&HMOVE).unwrap();
        c.probe.probe_finish(&HMOVE).unwrap();
    }
    c.probe.multi_probe_end().unwrap();
    assert_eq!(counts(&c), (3, 3));
}

#[test]
fn multi_probe_deploys_once_and_retracts_once() {
    let (mut c, _) = counted(false, "M280 P0 S10", "M280 P0 S90");
    c.probe.multi_probe_begin();
    assert_eq!(c.probe.state(), ProbeState::First);
    for _ in 0..3 {
        c.probe.probe_prepare(&HMOVE).unwrap();
        assert_eq!(c.probe.state(), ProbeState::On);
        c.probe.probe_finish(&HMOVE).unwrap();
    }
    assert_eq!(counts(&c), (1, 0));
    c.probe.multi_probe_end().unwrap();
    assert_eq!(counts(&c), (1, 1));
    assert_eq!(c.probe.state(), ProbeState::Off);
}

#[test]
fn moving_activate_script_is_fatal_and_named() {
    let (mut c, toolhead) = counted(true, "G1 Z15", "");
    let err = c.probe.probe_prepare(&HMOVE).expect_err("toolhead moved");
    assert!(matches!(
        err.downcast_ref::<ProbeError>(),
        Some(ProbeError::ToolheadMoved(ScriptKind::Activate))
    ));
    assert!(err.to_string().contains("activate_gcode"));
    assert_eq!(toolhead.get_position()[2], 15.0);
}

#[test]
fn moving_deactivate_script_is_fatal_and_named() {
    let (mut c, _) = counted(false, "", "G1 X0");
    c.probe.multi_probe_begin();
    c.probe.probe_prepare(&HMOVE).unwrap();
    let err = c.probe.multi_probe_end().expect_err("toolhead moved");
    assert!(matches!(
        err.downcast_ref::<ProbeError>(),
        Some(ProbeError::ToolheadMoved(ScriptKind::Deactivate))
    ));
    // State is reset even though the retract failed.
    assert_eq!(c.probe.state(), ProbeState::Off);
}

#[test]
fn extruder_motion_is_not_a_toolhead_move() {
    let toolhead = Arc::new(FixedToolhead([0.0, 0.0, 0.0, 0.0]));
    let mut probe = ProbeController::new(
        endstop(Arc::new(SimBoard::new("mcu", 16_000_000.0))),
        ProbeCfg::default(),
        toolhead,
        ActivationScripts {
            activate: Box::new(NoopScript),
            deactivate: Box::new(NoopScript),
        },
    );
    probe.probe_prepare(&HMOVE).unwrap();
    probe.probe_finish(&HMOVE).unwrap();
}

#[test]
fn identify_binds_only_z_steppers() {
    let mcu = Arc::new(SimBoard::new("mcu", 16_000_000.0));
    let b: Arc<dyn Board> = mcu.clone();
    let steppers: Vec<Arc<dyn Stepper>> = vec![
        Arc::new(SimStepper::new("stepper_x", b.clone(), &['x'])),
        Arc::new(SimStepper::new("stepper_y", b.clone(), &['y'])),
        Arc::new(SimStepper::new("stepper_z", b.clone(), &['z'])),
        Arc::new(SimStepper::new("stepper_z1", b, &['z'])),
    ];
    let kin = SimKinematics::new(steppers);

    let mut probe = ProbeController::new(
        endstop(mcu),
        ProbeCfg::default(),
        Arc::new(FixedToolhead::default()),
        ActivationScripts {
            activate: Box::new(NoopScript),
            deactivate: Box::new(NoopScript),
        },
    );
    {
        let mut init = InitSequence::new();
        probe.register_events(&mut init);
        init.run_identify(&kin).unwrap();
    }
    let names: Vec<String> = probe
        .steppers()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["stepper_z", "stepper_z1"]);
}

#[test]
fn controller_delegates_the_endstop_interface() {
    let (mut c, _) = counted(true, "", "");
    assert_eq!(c.probe.get_position_endstop(), 1.25);
    assert_eq!(c.probe.board().name(), "mcu");
    assert!(!c.probe.query_endstop(0.0));
    c.probe.home_start(10.0, 0.0, 0, 0.1).unwrap();
    assert_eq!(c.probe.home_wait(12.0).unwrap(), 0.0);
}
