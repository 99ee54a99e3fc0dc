use probe_core::error::ProbeError;
use probe_core::{
    AccelEndstop, ActivationScripts, HomingOutcome, ProbeCfg, ProbeController, ProbePlan,
    run_sequence,
};
use probe_hardware::{SimAccel, SimBehavior, SimBoard, SimDispatch, SimScript, SimToolhead};
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Bench {
    probe: ProbeController<AccelEndstop>,
    board: Arc<SimBoard>,
    retracts: Arc<AtomicUsize>,
}

fn bench(deactivate_on_each_sample: bool) -> Bench {
    let board = Arc::new(SimBoard::new("mcu", 16_000_000.0));
    let endstop = AccelEndstop::builder()
        .with_board(board.clone())
        .with_sensor(SimAccel::new("adxl345", 1000, 1))
        .with_dispatch(SimDispatch::new())
        .build()
        .expect("endstop builds");
    let toolhead = Arc::new(SimToolhead::default());
    let deact = SimScript::new("deactivate_gcode", "M280 P0 S90", toolhead.clone());
    let retracts = deact.run_counter();
    let probe = ProbeController::new(
        endstop,
        ProbeCfg {
            z_offset: 0.8,
            deactivate_on_each_sample,
        },
        toolhead.clone(),
        ActivationScripts {
            activate: Box::new(SimScript::new("activate_gcode", "", toolhead)),
            deactivate: Box::new(deact),
        },
    );
    Bench {
        probe,
        board,
        retracts,
    }
}

fn plan(samples: u32) -> ProbePlan {
    ProbePlan {
        samples,
        dwell: Duration::from_millis(5),
        ..ProbePlan::default()
    }
}

fn hit() -> SimBehavior {
    SimBehavior::EndstopHit {
        after: Duration::ZERO,
    }
}

fn comms() -> SimBehavior {
    SimBehavior::CommsTimeout {
        after: Duration::ZERO,
    }
}

#[test]
fn triggered_attempts_report_z_offset() {
    let mut b = bench(false);
    b.board.set_behavior(hit());
    let reports = run_sequence(&mut b.probe, &plan(3), 0, &|| false).unwrap();
    assert_eq!(reports.len(), 3);
    for (i, r) in reports.iter().enumerate() {
        assert_eq!(r.index, i as u32);
        assert_eq!(r.tries, 1);
        assert!(r.outcome.is_triggered());
        assert_eq!(r.position, Some(0.8));
    }
    // Consecutive moves do not overlap in print time.
    let starts: Vec<f64> = b.board.starts().iter().map(|s| s.print_time).collect();
    assert_eq!(starts, vec![1.0, 3.5, 6.0]);
    assert_eq!(b.retracts.load(Ordering::Relaxed), 1);
}

#[test]
fn quiet_attempt_is_no_trigger() {
    let mut b = bench(true);
    let reports = run_sequence(&mut b.probe, &plan(1), 0, &|| false).unwrap();
    assert_eq!(reports[0].outcome, HomingOutcome::NoTrigger);
    assert_eq!(reports[0].position, None);
}

#[test]
fn comms_failure_is_retried_within_budget() {
    let mut b = bench(true);
    b.board.queue_behaviors([comms(), comms()]);
    b.board.set_behavior(hit());
    let reports = run_sequence(&mut b.probe, &plan(1), 2, &|| false).unwrap();
    assert_eq!(reports[0].tries, 3);
    assert_eq!(reports[0].outcome, HomingOutcome::Triggered { at: 8.0 });
}

#[test]
fn exhausted_retries_abort_and_still_retract() {
    let mut b = bench(false);
    b.board.set_behavior(comms());
    let err = run_sequence(&mut b.probe, &plan(2), 1, &|| false).expect_err("comms");
    assert!(matches!(
        err.downcast_ref::<ProbeError>(),
        Some(ProbeError::CommsTimeout)
    ));
    assert_eq!(b.board.starts().len(), 2);
    assert_eq!(b.retracts.load(Ordering::Relaxed), 1, "multi_probe_end ran");
}

#[test]
fn interrupt_stops_between_attempts() {
    let mut b = bench(true);
    b.board.set_behavior(hit());
    let polls = Cell::new(0);
    let interrupted = || {
        polls.set(polls.get() + 1);
        polls.get() > 2
    };
    let err = run_sequence(&mut b.probe, &plan(5), 0, &interrupted).expect_err("interrupted");
    assert!(matches!(
        err.downcast_ref::<ProbeError>(),
        Some(ProbeError::Interrupted)
    ));
    assert_eq!(b.board.starts().len(), 2);
}

#[test]
fn empty_plan_is_rejected() {
    let mut b = bench(true);
    assert!(run_sequence(&mut b.probe, &plan(0), 0, &|| false).is_err());
    assert!(b.board.starts().is_empty());
}
