//! One board's trigger-sync channel and the steppers bound to it.

use probe_traits::{Board, Completion, Stepper, Trsync, TriggerReason};
use std::sync::Arc;

/// Window parameters of the last `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelWindow {
    pub print_time: f64,
    pub report_offset: f64,
    pub expire_timeout: f64,
}

pub struct TrsyncChannel {
    board: Arc<dyn Board>,
    trsync: Box<dyn Trsync>,
    steppers: Vec<Arc<dyn Stepper>>,
    window: Option<ChannelWindow>,
}

impl std::fmt::Debug for TrsyncChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrsyncChannel")
            .field("board", &self.board.name())
            .field(
                "steppers",
                &self.steppers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("window", &self.window)
            .finish()
    }
}

impl TrsyncChannel {
    pub fn new(board: Arc<dyn Board>) -> Self {
        let trsync = board.create_trsync();
        Self {
            board,
            trsync,
            steppers: Vec::new(),
            window: None,
        }
    }

    pub fn board(&self) -> &Arc<dyn Board> {
        &self.board
    }

    pub fn board_name(&self) -> &str {
        self.board.name()
    }

    pub fn add_stepper(&mut self, stepper: Arc<dyn Stepper>) {
        self.steppers.push(stepper);
    }

    pub fn steppers(&self) -> &[Arc<dyn Stepper>] {
        &self.steppers
    }

    /// Set while the channel is between `start` and `stop`.
    pub fn window(&self) -> Option<ChannelWindow> {
        self.window
    }

    pub fn start(
        &mut self,
        print_time: f64,
        report_offset: f64,
        completion: Completion,
        expire_timeout: f64,
    ) {
        tracing::trace!(
            board = %self.board.name(),
            print_time,
            report_offset,
            expire_timeout,
            "trsync start"
        );
        self.trsync
            .start(print_time, report_offset, completion, expire_timeout);
        self.window = Some(ChannelWindow {
            print_time,
            report_offset,
            expire_timeout,
        });
    }

    pub fn set_home_end_time(&mut self, home_end_time: f64) {
        self.trsync.set_home_end_time(home_end_time);
    }

    /// Stop the channel. Valid whether or not it was started.
    pub fn stop(&mut self) -> TriggerReason {
        let reason = self.trsync.stop();
        self.window = None;
        if reason == TriggerReason::CommsTimeout {
            tracing::warn!(board = %self.board.name(), "trsync reported comms timeout");
        } else {
            tracing::trace!(board = %self.board.name(), ?reason, "trsync stop");
        }
        reason
    }
}
