//! Aggregates per-board trigger-sync channels into one homing signal.
//!
//! Channel 0 is authoritative: its reason decides hit versus no-hit, and its
//! host-request reason is what the dispatch context relays to the others.
//! The dispatch context is started once per `arm` and stopped once per
//! `disarm`; a dispatcher dropped while armed disarms itself.

use crate::config::TrsyncTimeouts;
use crate::error::{ProbeError, Result};
use crate::trsync::TrsyncChannel;
use crate::util::{rail_group, report_offset};
use probe_traits::{Board, Completion, Stepper, TriggerDispatch, TriggerReason};
use std::sync::Arc;

/// Reasons collected by `disarm`, in channel registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisarmReport {
    pub reasons: Vec<TriggerReason>,
}

impl DisarmReport {
    pub fn any_comms_timeout(&self) -> bool {
        self.reasons.contains(&TriggerReason::CommsTimeout)
    }

    /// Reason of the authoritative channel.
    pub fn primary(&self) -> Option<TriggerReason> {
        self.reasons.first().copied()
    }
}

pub struct TriggerDispatcher {
    channels: Vec<TrsyncChannel>,
    dispatch: Box<dyn TriggerDispatch>,
    timeouts: TrsyncTimeouts,
    armed: bool,
}

impl std::fmt::Debug for TriggerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerDispatcher")
            .field("channels", &self.channels)
            .field("timeouts", &self.timeouts)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

impl TriggerDispatcher {
    pub fn new(dispatch: Box<dyn TriggerDispatch>, timeouts: TrsyncTimeouts) -> Self {
        Self {
            channels: Vec::new(),
            dispatch,
            timeouts,
            armed: false,
        }
    }

    fn position(&self, board: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.board_name() == board)
    }

    /// Channel for `board`, created (and registered with the dispatch
    /// context) on first use.
    pub fn add_board(&mut self, board: Arc<dyn Board>) -> &mut TrsyncChannel {
        let idx = match self.position(board.name()) {
            Some(i) => i,
            None => {
                self.dispatch.add_board(board.name());
                tracing::debug!(board = %board.name(), index = self.channels.len(), "trsync channel added");
                self.channels.push(TrsyncChannel::new(board));
                self.channels.len() - 1
            }
        };
        &mut self.channels[idx]
    }

    /// Bind `stepper` to its board's channel.
    ///
    /// A `stepper_*` whose rail siblings already live on a different board
    /// cannot be homed across boards; that wiring is rejected and the
    /// dispatcher is left untouched.
    pub fn add_stepper(&mut self, stepper: Arc<dyn Stepper>) -> Result<()> {
        let board = stepper.board();
        let target = self.position(board.name());
        if let Some(group) = rail_group(stepper.name()) {
            let conflict = self
                .channels
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != target)
                .flat_map(|(_, c)| c.steppers().iter())
                .find(|s| s.name().starts_with(group));
            if let Some(other) = conflict {
                return Err(eyre::Report::new(ProbeError::Config(format!(
                    "multi-board homing is not supported on a shared axis: '{}' on '{}' shares a rail with '{}' on another board",
                    stepper.name(),
                    board.name(),
                    other.name()
                ))));
            }
        }
        tracing::debug!(stepper = %stepper.name(), board = %board.name(), "stepper bound");
        self.add_board(board).add_stepper(stepper);
        Ok(())
    }

    pub fn channels(&self) -> &[TrsyncChannel] {
        &self.channels
    }

    /// Every bound stepper, channel by channel.
    pub fn steppers(&self) -> Vec<Arc<dyn Stepper>> {
        self.channels
            .iter()
            .flat_map(|c| c.steppers().iter().cloned())
            .collect()
    }

    pub fn primary_mut(&mut self) -> Option<&mut TrsyncChannel> {
        self.channels.first_mut()
    }

    pub fn timeouts(&self) -> TrsyncTimeouts {
        self.timeouts
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Start every channel against `completion`, then the dispatch context.
    pub fn arm(&mut self, print_time: f64, completion: &Completion) -> Result<()> {
        if self.armed {
            return Err(eyre::Report::new(ProbeError::State(
                "trigger dispatcher is already armed".into(),
            )));
        }
        if self.channels.is_empty() {
            return Err(eyre::Report::new(ProbeError::State(
                "trigger dispatcher has no channels".into(),
            )));
        }
        let n = self.channels.len();
        let expire_timeout = self.timeouts.for_channels(n);
        for (i, channel) in self.channels.iter_mut().enumerate() {
            channel.start(
                print_time,
                report_offset(i, n),
                completion.clone(),
                expire_timeout,
            );
        }
        self.dispatch.start(TriggerReason::HostRequest);
        self.armed = true;
        tracing::debug!(channels = n, expire_timeout, print_time, "dispatcher armed");
        Ok(())
    }

    /// Stop the dispatch context, then every channel.
    ///
    /// Both halves run on every call to an armed dispatcher. On an unarmed
    /// one the dispatch context is left alone so starts and stops stay
    /// paired, but the channels are still stopped.
    pub fn disarm(&mut self) -> DisarmReport {
        if self.armed {
            self.dispatch.stop();
        }
        let reasons: Vec<TriggerReason> = self.channels.iter_mut().map(|c| c.stop()).collect();
        self.armed = false;
        tracing::debug!(?reasons, "dispatcher disarmed");
        DisarmReport { reasons }
    }
}

impl Drop for TriggerDispatcher {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("trigger dispatcher dropped while armed; disarming");
            self.disarm();
        }
    }
}
