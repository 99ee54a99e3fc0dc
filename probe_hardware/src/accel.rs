//! Simulated accelerometer with a paced acquisition thread.
//!
//! While measuring, a background thread emits one batch every
//! `batch_size / rate_hz` seconds into the attached sink. Stopping (or
//! dropping the sensor) signals the thread and joins it, so no batch is
//! delivered after `finish_measurements` returns.

use crate::error::HwError;
use probe_traits::{AccelSensor, BoxError, SampleBatch, SampleSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Bytes per sample: x, y, z as little-endian i16.
const BYTES_PER_SAMPLE: usize = 6;

pub struct SimAccel {
    name: String,
    rate_hz: u32,
    batch_size: usize,
    sink: Option<Arc<dyn SampleSink>>,
    sequence: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
    fail_on_start: bool,
}

impl SimAccel {
    pub fn new(name: impl Into<String>, rate_hz: u32, batch_size: usize) -> Self {
        Self {
            name: name.into(),
            rate_hz: rate_hz.max(1),
            batch_size: batch_size.max(1),
            sink: None,
            sequence: Arc::new(AtomicU64::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
            join_handle: None,
            fail_on_start: false,
        }
    }

    /// Make `start_measurements` fail as if the chip did not answer.
    pub fn with_fail_on_start(mut self, fail: bool) -> Self {
        self.fail_on_start = fail;
        self
    }

    pub fn is_measuring(&self) -> bool {
        self.join_handle.is_some()
    }

    /// Number of batches emitted so far.
    pub fn batches_sent(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    fn batch_period(&self) -> Duration {
        let us = (self.batch_size as u64).saturating_mul(1_000_000) / u64::from(self.rate_hz);
        Duration::from_micros(us.max(1))
    }

    fn stop_thread(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!(sensor = %self.name, "acquisition thread joined"),
                Err(e) => tracing::warn!(sensor = %self.name, ?e, "acquisition thread panicked"),
            }
        }
    }
}

/// Deterministic pseudo samples: a slow ramp on z, flat x/y.
fn synth_batch(sequence: u64, batch_size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(batch_size * BYTES_PER_SAMPLE);
    for i in 0..batch_size {
        let z = ((sequence as usize * batch_size + i) % 512) as i16;
        for v in [0i16, 0i16, z] {
            data.extend_from_slice(&v.to_le_bytes());
        }
    }
    data
}

impl AccelSensor for SimAccel {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, sink: Arc<dyn SampleSink>) {
        self.sink = Some(sink);
    }

    fn start_measurements(&mut self) -> Result<(), BoxError> {
        if self.fail_on_start {
            return Err(Box::new(HwError::Timeout));
        }
        if self.join_handle.is_some() {
            return Err(Box::new(HwError::Busy(self.name.clone())));
        }
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| HwError::NotAttached(self.name.clone()))?;

        self.shutdown.store(false, Ordering::Relaxed);
        let shutdown = Arc::clone(&self.shutdown);
        let sequence = Arc::clone(&self.sequence);
        let batch_size = self.batch_size;
        let period = self.batch_period();

        self.join_handle = Some(std::thread::spawn(move || {
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let seq = sequence.fetch_add(1, Ordering::Relaxed);
                sink.handle_batch(SampleBatch {
                    sequence: seq,
                    data: synth_batch(seq, batch_size),
                });
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(period);
            }
            tracing::trace!("sim accel thread exiting");
        }));
        tracing::debug!(sensor = %self.name, rate_hz = self.rate_hz, "measurements started");
        Ok(())
    }

    fn finish_measurements(&mut self) -> Result<(), BoxError> {
        self.stop_thread();
        tracing::debug!(sensor = %self.name, "measurements finished");
        Ok(())
    }
}

impl Drop for SimAccel {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
