use probe_core::error::BuildError;
use probe_core::{AccelEndstop, HomingCfg, TrsyncTimeouts};
use probe_hardware::{SimAccel, SimBoard, SimDispatch};
use std::sync::Arc;
use std::time::Duration;

fn assert_build_err(err: eyre::Report, want: fn(&BuildError) -> bool) {
    match err.downcast_ref::<BuildError>() {
        Some(e) if want(e) => {}
        other => panic!("unexpected error: {other:?} ({err})"),
    }
}

#[test]
fn try_build_reports_each_missing_part() {
    let err = AccelEndstop::builder().try_build().expect_err("nothing set");
    assert_build_err(err, |e| matches!(e, BuildError::MissingBoard));

    let err = AccelEndstop::builder()
        .with_board(Arc::new(SimBoard::new("mcu", 16_000_000.0)))
        .try_build()
        .expect_err("no sensor");
    assert_build_err(err, |e| matches!(e, BuildError::MissingSensor));

    let err = AccelEndstop::builder()
        .with_board(Arc::new(SimBoard::new("mcu", 16_000_000.0)))
        .with_sensor(SimAccel::new("adxl345", 400, 8))
        .try_build()
        .expect_err("no dispatch");
    assert_build_err(err, |e| matches!(e, BuildError::MissingDispatch));
}

#[test]
fn invalid_timeouts_are_rejected() {
    let err = AccelEndstop::builder()
        .with_board(Arc::new(SimBoard::new("mcu", 16_000_000.0)))
        .with_sensor(SimAccel::new("adxl345", 400, 8))
        .with_dispatch(SimDispatch::new())
        .with_timeouts(TrsyncTimeouts {
            single_board: 0.0,
            multi_board: 0.25,
        })
        .build()
        .expect_err("zero expiry");
    assert_build_err(err, |e| matches!(e, BuildError::InvalidConfig(_)));
}

#[test]
fn zero_fallback_bound_is_rejected() {
    let err = AccelEndstop::builder()
        .with_board(Arc::new(SimBoard::new("mcu", 16_000_000.0)))
        .with_sensor(SimAccel::new("adxl345", 400, 8))
        .with_dispatch(SimDispatch::new())
        .with_homing(HomingCfg {
            fallback_after: Duration::ZERO,
            retries: 0,
        })
        .build()
        .expect_err("zero fallback");
    assert_build_err(err, |e| matches!(e, BuildError::InvalidConfig(_)));
}

#[test]
fn built_endstop_owns_one_channel_for_its_board() {
    let board = Arc::new(SimBoard::new("mcu", 16_000_000.0));
    let endstop = AccelEndstop::builder()
        .with_board(board.clone())
        .with_sensor(SimAccel::new("adxl345", 400, 8))
        .with_dispatch(SimDispatch::new())
        .build()
        .unwrap();
    assert_eq!(endstop.dispatcher().channels().len(), 1);
    assert_eq!(endstop.dispatcher().channels()[0].board_name(), "mcu");
    assert_eq!(endstop.sensor_name(), "adxl345");
    assert_eq!(board.trsyncs_created(), 1);
}
