//! Single-assignment rendezvous shared by everything that can end a homing
//! attempt.
//!
//! Any number of writers may call `complete`; only the first one sticks.
//! Readers block in `wait` until a value is present.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Slot {
    value: Mutex<Option<bool>>,
    ready: Condvar,
}

/// Cloneable handle to one completion slot. The payload is a failure flag:
/// `true` when the writer observed a failure (e.g. a comms timeout).
#[derive(Debug, Clone, Default)]
pub struct Completion {
    slot: Arc<Slot>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fulfill the completion. Returns `true` if this call was the one that
    /// fulfilled it; later calls are no-ops and return `false`.
    pub fn complete(&self, is_failure: bool) -> bool {
        let mut guard = self
            .slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return false;
        }
        *guard = Some(is_failure);
        self.slot.ready.notify_all();
        true
    }

    pub fn is_complete(&self) -> bool {
        self.peek().is_some()
    }

    /// Current value without blocking.
    pub fn peek(&self) -> Option<bool> {
        *self
            .slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until fulfilled and return the stored value.
    pub fn wait(&self) -> bool {
        let mut guard = self
            .slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(v) = *guard {
                return v;
            }
            guard = self
                .slot
                .ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`. `None` if still unfulfilled.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<bool> {
        let guard = self
            .slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _res) = self
            .slot
            .ready
            .wait_timeout_while(guard, timeout, |v| v.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// True when both handles refer to the same slot.
    pub fn same_as(&self, other: &Completion) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}
