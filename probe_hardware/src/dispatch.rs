//! Simulated cross-board dispatch context with start/stop accounting.

use probe_traits::{TriggerDispatch, TriggerReason};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub starts: usize,
    pub stops: usize,
    pub active: bool,
    pub boards: Vec<String>,
    pub host_reason: Option<TriggerReason>,
}

/// Dispatch context whose counters stay readable after it has been boxed
/// and handed to a dispatcher.
#[derive(Debug, Default)]
pub struct SimDispatch {
    stats: Arc<Mutex<DispatchStats>>,
}

impl SimDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the counters.
    pub fn stats_handle(&self) -> DispatchStatsHandle {
        DispatchStatsHandle(Arc::clone(&self.stats))
    }

    fn with<R>(&self, f: impl FnOnce(&mut DispatchStats) -> R) -> R {
        let mut st = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut st)
    }
}

#[derive(Debug, Clone)]
pub struct DispatchStatsHandle(Arc<Mutex<DispatchStats>>);

impl DispatchStatsHandle {
    pub fn snapshot(&self) -> DispatchStats {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TriggerDispatch for SimDispatch {
    fn add_board(&mut self, board: &str) {
        self.with(|st| st.boards.push(board.to_string()));
    }

    fn start(&mut self, host_reason: TriggerReason) {
        self.with(|st| {
            if st.active {
                tracing::warn!("dispatch started while already active");
            }
            st.starts += 1;
            st.active = true;
            st.host_reason = Some(host_reason);
        });
    }

    fn stop(&mut self) {
        self.with(|st| {
            st.stops += 1;
            st.active = false;
        });
    }
}
