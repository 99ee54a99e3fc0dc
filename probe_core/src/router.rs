//! Two-mode router for the accelerometer's bulk sample stream.
//!
//! In `Buffering` mode (the default) every batch is queued in arrival order
//! for whoever drains the router later. While a homing session holds the
//! router in `Intercepting` mode, batches go straight to the session's
//! trigger-evaluation callback and nothing is queued.
//!
//! The callback runs with the mode lock held, so once `end_intercept`
//! returns the callback will not be invoked again.
use crate::error::{ProbeError, Result};
use crossbeam_channel as xch;
use probe_traits::{SampleBatch, SampleSink};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-batch trigger evaluation installed by a homing session.
pub type InterceptFn = Box<dyn FnMut(&SampleBatch) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterMode {
    Buffering,
    Intercepting,
}

enum Route {
    Buffering,
    Intercepting(InterceptFn),
}

pub struct BulkSampleRouter {
    route: Mutex<Route>,
    tx: xch::Sender<SampleBatch>,
    rx: xch::Receiver<SampleBatch>,
}

impl Default for BulkSampleRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BulkSampleRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkSampleRouter")
            .field("mode", &self.mode())
            .field("buffered", &self.buffered())
            .finish()
    }
}

impl BulkSampleRouter {
    pub fn new() -> Self {
        let (tx, rx) = xch::unbounded();
        Self {
            route: Mutex::new(Route::Buffering),
            tx,
            rx,
        }
    }

    fn route(&self) -> MutexGuard<'_, Route> {
        self.route.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> RouterMode {
        match *self.route() {
            Route::Buffering => RouterMode::Buffering,
            Route::Intercepting(_) => RouterMode::Intercepting,
        }
    }

    /// Hand every subsequent batch to `callback` instead of the buffer.
    ///
    /// Only one session may intercept at a time.
    pub fn begin_intercept(&self, callback: InterceptFn) -> Result<()> {
        let mut route = self.route();
        if matches!(*route, Route::Intercepting(_)) {
            return Err(eyre::Report::new(ProbeError::State(
                "sample stream is already intercepted by another homing session".into(),
            )));
        }
        *route = Route::Intercepting(callback);
        tracing::debug!("sample router intercepting");
        Ok(())
    }

    /// Return to buffering. Returns whether a callback was installed.
    pub fn end_intercept(&self) -> bool {
        let prev = std::mem::replace(&mut *self.route(), Route::Buffering);
        let was = matches!(prev, Route::Intercepting(_));
        if was {
            tracing::debug!("sample router buffering");
        }
        was
    }

    /// Take every buffered batch, oldest first.
    pub fn drain(&self) -> Vec<SampleBatch> {
        self.rx.try_iter().collect()
    }

    /// A receiver over the same buffer, for consumers on other threads.
    pub fn subscribe(&self) -> xch::Receiver<SampleBatch> {
        self.rx.clone()
    }

    pub fn buffered(&self) -> usize {
        self.rx.len()
    }
}

impl SampleSink for BulkSampleRouter {
    fn handle_batch(&self, batch: SampleBatch) {
        let mut route = self.route();
        match &mut *route {
            Route::Intercepting(callback) => callback(&batch),
            Route::Buffering => {
                // The router owns a receiver, so the channel never disconnects.
                let _ = self.tx.send(batch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn batch(sequence: u64) -> SampleBatch {
        SampleBatch {
            sequence,
            data: vec![0; 6],
        }
    }

    #[test]
    fn buffers_in_arrival_order_by_default() {
        let r = BulkSampleRouter::new();
        for s in 0..3 {
            r.handle_batch(batch(s));
        }
        let seqs: Vec<u64> = r.drain().iter().map(|b| b.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn intercept_bypasses_buffer() {
        let r = BulkSampleRouter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        r.begin_intercept(Box::new(move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        }))
        .unwrap();
        r.handle_batch(batch(7));
        r.handle_batch(batch(8));
        assert_eq!(hits.load(Ordering::Relaxed), 2);
        assert_eq!(r.buffered(), 0);

        assert!(r.end_intercept());
        r.handle_batch(batch(9));
        assert_eq!(hits.load(Ordering::Relaxed), 2);
        assert_eq!(r.buffered(), 1);
    }

    #[test]
    fn second_intercept_is_rejected() {
        let r = BulkSampleRouter::new();
        r.begin_intercept(Box::new(|_| {})).unwrap();
        let err = r.begin_intercept(Box::new(|_| {})).expect_err("busy");
        assert!(matches!(
            err.downcast_ref::<ProbeError>(),
            Some(ProbeError::State(_))
        ));
        assert_eq!(r.mode(), RouterMode::Intercepting);
    }

    #[test]
    fn end_without_intercept_is_harmless() {
        let r = BulkSampleRouter::new();
        assert!(!r.end_intercept());
        assert_eq!(r.mode(), RouterMode::Buffering);
    }
}
