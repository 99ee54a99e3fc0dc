//! One homing attempt: its parameters, state, and the shared trigger slot.

use crate::dispatcher::DisarmReport;
use crate::error::{ProbeError, Result};
use crate::router::InterceptFn;
use crate::trigger::TriggerCriterion;
use probe_traits::{Completion, TriggerReason};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle of a homing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Arming,
    Sampling,
    Resolving,
    Done,
}

impl SessionState {
    fn next(self) -> Option<SessionState> {
        match self {
            SessionState::Idle => Some(SessionState::Arming),
            SessionState::Arming => Some(SessionState::Sampling),
            SessionState::Sampling => Some(SessionState::Resolving),
            SessionState::Resolving => Some(SessionState::Done),
            SessionState::Done => None,
        }
    }
}

#[derive(Debug)]
pub struct HomingSession {
    print_time: f64,
    sample_time: f64,
    sample_count: u32,
    rest_time: f64,
    rest_ticks: u64,
    completion: Completion,
    state: SessionState,
}

impl HomingSession {
    /// A fresh attempt in `Arming` with its own completion.
    pub fn new(
        print_time: f64,
        sample_time: f64,
        sample_count: u32,
        rest_time: f64,
        rest_ticks: u64,
    ) -> Self {
        Self {
            print_time,
            sample_time,
            sample_count,
            rest_time,
            rest_ticks,
            completion: Completion::new(),
            state: SessionState::Arming,
        }
    }

    pub fn print_time(&self) -> f64 {
        self.print_time
    }

    pub fn sample_time(&self) -> f64 {
        self.sample_time
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn rest_time(&self) -> f64 {
        self.rest_time
    }

    pub fn rest_ticks(&self) -> u64 {
        self.rest_ticks
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to the next state. Only forward single steps are allowed.
    pub fn advance(&mut self, to: SessionState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(eyre::Report::new(ProbeError::State(format!(
                "homing session cannot go from {:?} to {to:?}",
                self.state
            ))));
        }
        self.state = to;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TriggerSlot {
    completion: Mutex<Option<Completion>>,
    triggered: AtomicBool,
}

/// Host-side way to force the current attempt to trigger.
///
/// Cloneable and `Send`; firing while no attempt is open does nothing.
#[derive(Debug, Clone, Default)]
pub struct TriggerHandle {
    slot: Arc<TriggerSlot>,
}

impl TriggerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a trigger. Returns `false` when no attempt is open.
    pub fn trigger(&self) -> bool {
        let guard = self
            .slot
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(c) => {
                self.slot.triggered.store(true, Ordering::SeqCst);
                if c.complete(false) {
                    tracing::info!("host-side trigger fired");
                }
                true
            }
            None => false,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.slot.triggered.load(Ordering::SeqCst)
    }

    /// Open a new attempt: clear the flag and point at its completion.
    pub(crate) fn open(&self, completion: &Completion) {
        let mut guard = self
            .slot
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.slot.triggered.store(false, Ordering::SeqCst);
        *guard = Some(completion.clone());
    }

    /// Close the attempt and return whether a forced trigger fired.
    /// The flag is cleared on every path.
    pub(crate) fn close(&self) -> bool {
        let mut guard = self
            .slot
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        self.slot.triggered.swap(false, Ordering::SeqCst)
    }

    /// Router callback: evaluate `criterion` on each batch and trigger once it holds.
    pub(crate) fn intercept(&self, criterion: Arc<Mutex<Box<dyn TriggerCriterion>>>) -> InterceptFn {
        let handle = self.clone();
        Box::new(move |batch| {
            let hit = criterion
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .evaluate(batch);
            if hit {
                handle.trigger();
            }
        })
    }
}

/// Resolve the motion-contract value of a finished attempt.
///
/// `-1.0` for any comms timeout, `home_end_time` for a forced trigger or a
/// genuine hit, `0.0` when the authoritative channel did not hit.
pub fn resolve(home_end_time: f64, report: &DisarmReport, forced: bool) -> f64 {
    if report.any_comms_timeout() {
        return -1.0;
    }
    if forced {
        return home_end_time;
    }
    if report.primary() != Some(TriggerReason::EndstopHit) {
        return 0.0;
    }
    home_end_time
}
