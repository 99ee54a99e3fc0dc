//! Accelerometer-backed virtual endstop.
//!
//! `home_start` arms every trigger-sync channel, diverts the sensor's sample
//! stream into the trigger criterion and starts acquisition. `home_wait`
//! undoes all of that, blocks until the attempt's completion is fulfilled
//! and turns the channels' reasons into the motion-contract value.

use crate::dispatcher::TriggerDispatcher;
use crate::error::{ProbeError, Result};
use crate::hw_error::report;
use crate::router::BulkSampleRouter;
use crate::session::{HomingSession, SessionState, TriggerHandle, resolve};
use crate::trigger::TriggerCriterion;
use crate::util::rest_ticks;
use probe_traits::{AccelSensor, Board, Completion, Stepper};
use std::sync::{Arc, Mutex, PoisonError};

/// Interface the motion planner drives during a homing move.
pub trait HomingEndstop {
    /// Board whose clock the endstop reports against.
    fn board(&self) -> Arc<dyn Board>;
    fn add_stepper(&mut self, stepper: Arc<dyn Stepper>) -> Result<()>;
    fn steppers(&self) -> Vec<Arc<dyn Stepper>>;
    /// Begin an attempt and return the completion the planner may poll.
    fn home_start(
        &mut self,
        print_time: f64,
        sample_time: f64,
        sample_count: u32,
        rest_time: f64,
    ) -> Result<Completion>;
    /// Finish the attempt: `> 0` trigger time, `0` no trigger, `< 0` comms failure.
    fn home_wait(&mut self, home_end_time: f64) -> Result<f64>;
    fn query_endstop(&self, print_time: f64) -> bool;
}

pub struct AccelEndstop {
    board: Arc<dyn Board>,
    sensor: Box<dyn AccelSensor>,
    router: Arc<BulkSampleRouter>,
    dispatcher: TriggerDispatcher,
    criterion: Arc<Mutex<Box<dyn TriggerCriterion>>>,
    trigger: TriggerHandle,
    session: Option<HomingSession>,
    last_state: SessionState,
    last_rest_ticks: u64,
}

impl std::fmt::Debug for AccelEndstop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccelEndstop")
            .field("board", &self.board.name())
            .field("sensor", &self.sensor.name())
            .field("dispatcher", &self.dispatcher)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AccelEndstop {
    /// Wire the parts together. The sensor's board becomes channel 0.
    pub(crate) fn from_parts(
        board: Arc<dyn Board>,
        mut sensor: Box<dyn AccelSensor>,
        mut dispatcher: TriggerDispatcher,
        criterion: Box<dyn TriggerCriterion>,
    ) -> Self {
        let router = Arc::new(BulkSampleRouter::new());
        sensor.attach(router.clone());
        dispatcher.add_board(Arc::clone(&board));
        Self {
            board,
            sensor,
            router,
            dispatcher,
            criterion: Arc::new(Mutex::new(criterion)),
            trigger: TriggerHandle::new(),
            session: None,
            last_state: SessionState::Idle,
            last_rest_ticks: 0,
        }
    }

    pub fn router(&self) -> &Arc<BulkSampleRouter> {
        &self.router
    }

    pub fn dispatcher(&self) -> &TriggerDispatcher {
        &self.dispatcher
    }

    pub fn sensor_name(&self) -> &str {
        self.sensor.name()
    }

    /// Handle that forces the open attempt to trigger, usable from any thread.
    pub fn trigger_handle(&self) -> TriggerHandle {
        self.trigger.clone()
    }

    /// Force the open attempt to trigger now.
    pub fn trigger(&self) -> bool {
        self.trigger.trigger()
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(self.last_state, HomingSession::state)
    }

    /// Rest interval, in board ticks, of the current or last attempt.
    pub fn rest_ticks(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(self.last_rest_ticks, HomingSession::rest_ticks)
    }

    fn finish(&mut self, session: &HomingSession) {
        self.last_state = session.state();
        self.last_rest_ticks = session.rest_ticks();
    }

    /// Undo a partial `home_start`, newest step first.
    fn unwind_start(&mut self, armed: bool, intercepting: bool) {
        if intercepting {
            self.router.end_intercept();
        }
        if armed {
            self.dispatcher.disarm();
        }
        self.trigger.close();
        self.last_state = SessionState::Idle;
    }

    fn set_criterion_epoch(&self) {
        self.criterion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}

impl HomingEndstop for AccelEndstop {
    fn board(&self) -> Arc<dyn Board> {
        Arc::clone(&self.board)
    }

    fn add_stepper(&mut self, stepper: Arc<dyn Stepper>) -> Result<()> {
        self.dispatcher.add_stepper(stepper)
    }

    fn steppers(&self) -> Vec<Arc<dyn Stepper>> {
        self.dispatcher.steppers()
    }

    fn home_start(
        &mut self,
        print_time: f64,
        sample_time: f64,
        sample_count: u32,
        rest_time: f64,
    ) -> Result<Completion> {
        if self.session.is_some() {
            return Err(eyre::Report::new(ProbeError::State(
                "home_start called while a homing attempt is open".into(),
            )));
        }

        let ticks = rest_ticks(self.board.as_ref(), print_time, rest_time);
        let mut session = HomingSession::new(print_time, sample_time, sample_count, rest_time, ticks);
        let completion = session.completion().clone();
        self.trigger.open(&completion);
        self.set_criterion_epoch();

        if let Err(e) = self.dispatcher.arm(print_time, &completion) {
            self.unwind_start(false, false);
            return Err(e);
        }

        let callback = self.trigger.intercept(Arc::clone(&self.criterion));
        if let Err(e) = self.router.begin_intercept(callback) {
            self.unwind_start(true, false);
            return Err(e);
        }

        if let Err(e) = self.sensor.start_measurements() {
            tracing::warn!(sensor = %self.sensor.name(), error = %e, "accelerometer failed to start; unwinding");
            self.unwind_start(true, true);
            return Err(report(e));
        }

        session.advance(SessionState::Sampling)?;
        tracing::info!(
            print_time,
            rest_ticks = ticks,
            channels = self.dispatcher.channels().len(),
            "homing started"
        );
        self.session = Some(session);
        Ok(completion)
    }

    fn home_wait(&mut self, home_end_time: f64) -> Result<f64> {
        let mut session = self.session.take().ok_or_else(|| {
            eyre::Report::new(ProbeError::State(
                "home_wait called without home_start".into(),
            ))
        })?;
        session.advance(SessionState::Resolving)?;

        let finished = self.sensor.finish_measurements();
        self.router.end_intercept();

        if let Some(primary) = self.dispatcher.primary_mut() {
            primary.set_home_end_time(home_end_time);
        }
        let completion = session.completion();
        if self.board.is_fileoutput() {
            completion.complete(false);
        }
        completion.wait();

        let disarm = self.dispatcher.disarm();
        let forced = self.trigger.close();
        session.advance(SessionState::Done)?;
        self.finish(&session);

        if let Err(e) = finished {
            return Err(report(e));
        }

        let result = resolve(home_end_time, &disarm, forced);
        if result < 0.0 {
            tracing::warn!(reasons = ?disarm.reasons, "homing ended with a communication timeout");
        } else {
            tracing::info!(result, forced, reasons = ?disarm.reasons, "homing resolved");
        }
        Ok(result)
    }

    fn query_endstop(&self, _print_time: f64) -> bool {
        false
    }
}

impl Drop for AccelEndstop {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            tracing::warn!("accel endstop dropped mid-attempt; stopping acquisition");
            if let Err(e) = self.sensor.finish_measurements() {
                tracing::warn!(error = %e, "accelerometer stop failed during drop");
            }
            self.router.end_intercept();
            self.dispatcher.disarm();
            self.trigger.close();
        }
    }
}
