//! Acquisition thread lifecycle of the simulated accelerometer.
//!
//! Verifies that:
//! - batches arrive in sequence order
//! - nothing is delivered once `finish_measurements` returns
//! - the sensor can be restarted and dropped while running

use probe_hardware::SimAccel;
use probe_traits::{AccelSensor, SampleBatch, SampleSink};
use rstest::rstest;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Collect(Mutex<Vec<u64>>);

impl SampleSink for Collect {
    fn handle_batch(&self, batch: SampleBatch) {
        self.0.lock().unwrap().push(batch.sequence);
    }
}

impl Collect {
    fn seen(&self) -> Vec<u64> {
        self.0.lock().unwrap().clone()
    }
}

#[rstest]
fn batches_arrive_in_order_and_stop_on_finish() {
    let sink = Arc::new(Collect::default());
    let mut accel = SimAccel::new("adxl345", 1000, 5);
    accel.attach(sink.clone());
    accel.start_measurements().unwrap();
    std::thread::sleep(Duration::from_millis(40));
    accel.finish_measurements().unwrap();

    let seen = sink.seen();
    assert!(!seen.is_empty(), "expected at least one batch");
    assert!(seen.windows(2).all(|w| w[1] == w[0] + 1), "out of order: {seen:?}");

    let after = seen.len();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(sink.seen().len(), after, "batch delivered after finish");
    assert!(!accel.is_measuring());
}

#[rstest]
fn second_start_while_running_is_rejected() {
    let mut accel = SimAccel::new("adxl345", 100, 1);
    accel.attach(Arc::new(Collect::default()));
    accel.start_measurements().unwrap();
    let err = accel.start_measurements().expect_err("busy");
    assert!(err.to_string().contains("already acquiring"));
    accel.finish_measurements().unwrap();
}

#[rstest]
fn restart_continues_sequence() {
    let sink = Arc::new(Collect::default());
    let mut accel = SimAccel::new("adxl345", 1000, 1);
    accel.attach(sink.clone());
    for _ in 0..2 {
        accel.start_measurements().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        accel.finish_measurements().unwrap();
    }
    let seen = sink.seen();
    assert_eq!(seen.len() as u64, accel.batches_sent());
}

#[rstest]
fn drop_while_measuring_is_prompt() {
    let mut accel = SimAccel::new("adxl345", 50, 1);
    accel.attach(Arc::new(Collect::default()));
    accel.start_measurements().unwrap();
    std::thread::sleep(Duration::from_millis(10));
    let start = Instant::now();
    drop(accel);
    // One batch period at 50 Hz is 20 ms; allow generous slack.
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[rstest]
fn failing_start_reports_timeout() {
    let mut accel = SimAccel::new("adxl345", 100, 1).with_fail_on_start(true);
    accel.attach(Arc::new(Collect::default()));
    let err = accel.start_measurements().expect_err("should fail");
    assert!(err.to_string().contains("timeout"));
    assert!(!accel.is_measuring());
}
