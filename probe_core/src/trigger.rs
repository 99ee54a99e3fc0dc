//! Host-side trigger evaluation over intercepted sample batches.

use probe_traits::{Clock, SampleBatch};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Decides, batch by batch, whether the probe has triggered.
pub trait TriggerCriterion: Send {
    /// Called at `home_start`, before the first batch of the attempt.
    fn reset(&mut self);
    /// True once the trigger condition holds.
    fn evaluate(&mut self, batch: &SampleBatch) -> bool;
}

/// Forces a trigger once more than `after` has elapsed since `reset`,
/// provided batches keep arriving.
pub struct ElapsedFallback {
    clock: Arc<dyn Clock + Send + Sync>,
    after: Duration,
    started: Instant,
}

impl ElapsedFallback {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, after: Duration) -> Self {
        let started = clock.now();
        Self {
            clock,
            after,
            started,
        }
    }

    pub fn after(&self) -> Duration {
        self.after
    }
}

impl std::fmt::Debug for ElapsedFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElapsedFallback")
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

impl TriggerCriterion for ElapsedFallback {
    fn reset(&mut self) {
        self.started = self.clock.now();
    }

    fn evaluate(&mut self, _batch: &SampleBatch) -> bool {
        self.clock.elapsed_since(self.started) > self.after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_traits::clock::test_clock::TestClock;

    fn batch() -> SampleBatch {
        SampleBatch {
            sequence: 0,
            data: Vec::new(),
        }
    }

    #[test]
    fn fires_strictly_after_bound() {
        let clock = TestClock::new();
        let mut c = ElapsedFallback::new(Arc::new(clock.clone()), Duration::from_secs(8));
        c.reset();
        clock.advance(Duration::from_secs(8));
        assert!(!c.evaluate(&batch()));
        clock.advance(Duration::from_millis(1));
        assert!(c.evaluate(&batch()));
    }

    #[test]
    fn reset_restarts_the_window() {
        let clock = TestClock::new();
        let mut c = ElapsedFallback::new(Arc::new(clock.clone()), Duration::from_secs(1));
        clock.advance(Duration::from_secs(5));
        c.reset();
        assert!(!c.evaluate(&batch()));
    }
}
