//! Simulated controller board and its trigger-sync channel.

use probe_traits::{Board, Completion, Trsync, TriggerReason};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// What a simulated board does once its channel is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimBehavior {
    /// Never triggers on its own; the channel ends when the homing window closes.
    #[default]
    Quiet,
    /// Report an endstop hit after the given delay (zero = immediately on start).
    EndstopHit { after: Duration },
    /// Report a comms timeout after the given delay.
    CommsTimeout { after: Duration },
}

/// Parameters of one `Trsync::start` call, kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrsyncStart {
    pub print_time: f64,
    pub report_offset: f64,
    pub expire_timeout: f64,
}

#[derive(Debug, Default)]
struct BoardLog {
    starts: Vec<TrsyncStart>,
    home_end_times: Vec<f64>,
    stops: Vec<TriggerReason>,
    trsyncs_created: usize,
}

pub struct SimBoard {
    name: String,
    frequency: f64,
    fileoutput: bool,
    behavior: Arc<Mutex<SimBehavior>>,
    queued: Arc<Mutex<VecDeque<SimBehavior>>>,
    log: Arc<Mutex<BoardLog>>,
}

impl SimBoard {
    pub fn new(name: impl Into<String>, frequency: f64) -> Self {
        Self {
            name: name.into(),
            frequency,
            fileoutput: false,
            behavior: Arc::new(Mutex::new(SimBehavior::Quiet)),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            log: Arc::new(Mutex::new(BoardLog::default())),
        }
    }

    /// Dry-run board: writes commands to a file, never reports back.
    pub fn with_fileoutput(mut self, fileoutput: bool) -> Self {
        self.fileoutput = fileoutput;
        self
    }

    pub fn with_behavior(self, behavior: SimBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    /// Change the behaviour used by the next `start`.
    pub fn set_behavior(&self, behavior: SimBehavior) {
        *self
            .behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    /// One-shot behaviours consumed by the next starts, in order, before
    /// falling back to the standing behaviour.
    pub fn queue_behaviors(&self, behaviors: impl IntoIterator<Item = SimBehavior>) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(behaviors);
    }

    pub fn starts(&self) -> Vec<TrsyncStart> {
        self.log().starts.clone()
    }

    pub fn home_end_times(&self) -> Vec<f64> {
        self.log().home_end_times.clone()
    }

    pub fn stops(&self) -> Vec<TriggerReason> {
        self.log().stops.clone()
    }

    pub fn trsyncs_created(&self) -> usize {
        self.log().trsyncs_created
    }

    fn log(&self) -> std::sync::MutexGuard<'_, BoardLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Board for SimBoard {
    fn name(&self) -> &str {
        &self.name
    }

    fn print_time_to_clock(&self, print_time: f64) -> u64 {
        // Saturating cast: negative times clamp to tick 0.
        (print_time * self.frequency).round() as u64
    }

    fn is_fileoutput(&self) -> bool {
        self.fileoutput
    }

    fn create_trsync(&self) -> Box<dyn Trsync> {
        self.log().trsyncs_created += 1;
        Box::new(SimTrsync {
            board: self.name.clone(),
            behavior: Arc::clone(&self.behavior),
            queued: Arc::clone(&self.queued),
            log: Arc::clone(&self.log),
            state: Arc::new(Mutex::new(ChannelState::default())),
        })
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    completion: Option<Completion>,
    fired: Option<TriggerReason>,
    // Bumped on every start/stop so stale delayed reports are discarded.
    generation: u64,
}

fn fire(state: &Mutex<ChannelState>, generation: u64, reason: TriggerReason) {
    let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
    if st.generation != generation || st.fired.is_some() {
        return;
    }
    st.fired = Some(reason);
    if let Some(c) = &st.completion {
        c.complete(reason.is_failure());
    }
}

pub struct SimTrsync {
    board: String,
    behavior: Arc<Mutex<SimBehavior>>,
    queued: Arc<Mutex<VecDeque<SimBehavior>>>,
    log: Arc<Mutex<BoardLog>>,
    state: Arc<Mutex<ChannelState>>,
}

impl SimTrsync {
    fn schedule(&self, generation: u64, reason: TriggerReason, after: Duration) {
        if after.is_zero() {
            fire(&self.state, generation, reason);
            return;
        }
        let state = Arc::clone(&self.state);
        std::thread::spawn(move || {
            std::thread::sleep(after);
            fire(&state, generation, reason);
        });
    }
}

impl Trsync for SimTrsync {
    fn start(
        &mut self,
        print_time: f64,
        report_offset: f64,
        completion: Completion,
        expire_timeout: f64,
    ) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .starts
            .push(TrsyncStart {
                print_time,
                report_offset,
                expire_timeout,
            });
        let generation = {
            let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            st.generation += 1;
            st.completion = Some(completion);
            st.fired = None;
            st.generation
        };
        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let behavior = queued.unwrap_or_else(|| {
            *self
                .behavior
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        });
        tracing::trace!(board = %self.board, ?behavior, report_offset, "sim trsync start");
        match behavior {
            SimBehavior::Quiet => {}
            SimBehavior::EndstopHit { after } => {
                self.schedule(generation, TriggerReason::EndstopHit, after);
            }
            SimBehavior::CommsTimeout { after } => {
                self.schedule(generation, TriggerReason::CommsTimeout, after);
            }
        }
    }

    fn set_home_end_time(&mut self, home_end_time: f64) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .home_end_times
            .push(home_end_time);
        // The simulated move has already finished, so the window is over.
        let generation = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation;
        fire(&self.state, generation, TriggerReason::HostRequest);
    }

    fn stop(&mut self) -> TriggerReason {
        let reason = {
            let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            st.generation += 1;
            st.completion = None;
            st.fired.take().unwrap_or(TriggerReason::HostRequest)
        };
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stops
            .push(reason);
        tracing::trace!(board = %self.board, ?reason, "sim trsync stop");
        reason
    }
}
