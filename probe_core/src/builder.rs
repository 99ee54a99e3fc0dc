//! Type-state builder for `AccelEndstop`.
//!
//! `build()` is only available once the board, the sensor and the dispatch
//! context are set. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use probe_traits::clock::{Clock, MonotonicClock};
use probe_traits::{AccelSensor, Board, TriggerDispatch};

use crate::config::{HomingCfg, TrsyncTimeouts};
use crate::dispatcher::TriggerDispatcher;
use crate::endstop::AccelEndstop;
use crate::error::{BuildError, Result};
use crate::trigger::{ElapsedFallback, TriggerCriterion};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct EndstopBuilder<B, S, D> {
    board: Option<Arc<dyn Board>>,
    sensor: Option<Box<dyn AccelSensor>>,
    dispatch: Option<Box<dyn TriggerDispatch>>,
    timeouts: Option<TrsyncTimeouts>,
    homing: Option<HomingCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    criterion: Option<Box<dyn TriggerCriterion>>,
    _b: PhantomData<B>,
    _s: PhantomData<S>,
    _d: PhantomData<D>,
}

impl Default for EndstopBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            board: None,
            sensor: None,
            dispatch: None,
            timeouts: None,
            homing: None,
            clock: None,
            criterion: None,
            _b: PhantomData,
            _s: PhantomData,
            _d: PhantomData,
        }
    }
}

impl AccelEndstop {
    pub fn builder() -> EndstopBuilder<Missing, Missing, Missing> {
        EndstopBuilder::default()
    }
}

fn validate_timeouts(t: &TrsyncTimeouts) -> Result<()> {
    if !(t.single_board.is_finite() && t.single_board > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "single-board trsync timeout must be > 0",
        )));
    }
    if !(t.multi_board.is_finite() && t.multi_board > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "multi-board trsync timeout must be > 0",
        )));
    }
    Ok(())
}

impl<B, S, D> EndstopBuilder<B, S, D> {
    /// Board the accelerometer is wired to. Its channel is authoritative.
    pub fn with_board(self, board: Arc<dyn Board>) -> EndstopBuilder<Set, S, D> {
        EndstopBuilder {
            board: Some(board),
            sensor: self.sensor,
            dispatch: self.dispatch,
            timeouts: self.timeouts,
            homing: self.homing,
            clock: self.clock,
            criterion: self.criterion,
            _b: PhantomData,
            _s: PhantomData,
            _d: PhantomData,
        }
    }

    pub fn with_sensor(self, sensor: impl AccelSensor + 'static) -> EndstopBuilder<B, Set, D> {
        self.with_boxed_sensor(Box::new(sensor))
    }

    pub fn with_boxed_sensor(self, sensor: Box<dyn AccelSensor>) -> EndstopBuilder<B, Set, D> {
        EndstopBuilder {
            board: self.board,
            sensor: Some(sensor),
            dispatch: self.dispatch,
            timeouts: self.timeouts,
            homing: self.homing,
            clock: self.clock,
            criterion: self.criterion,
            _b: PhantomData,
            _s: PhantomData,
            _d: PhantomData,
        }
    }

    pub fn with_dispatch(
        self,
        dispatch: impl TriggerDispatch + 'static,
    ) -> EndstopBuilder<B, S, Set> {
        EndstopBuilder {
            board: self.board,
            sensor: self.sensor,
            dispatch: Some(Box::new(dispatch)),
            timeouts: self.timeouts,
            homing: self.homing,
            clock: self.clock,
            criterion: self.criterion,
            _b: PhantomData,
            _s: PhantomData,
            _d: PhantomData,
        }
    }

    pub fn with_timeouts(mut self, timeouts: TrsyncTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Fallback bound for the default criterion.
    pub fn with_homing(mut self, homing: HomingCfg) -> Self {
        self.homing = Some(homing);
        self
    }

    /// Clock for the default criterion.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the default elapsed-time criterion.
    pub fn with_criterion(mut self, criterion: Box<dyn TriggerCriterion>) -> Self {
        self.criterion = Some(criterion);
        self
    }

    /// Validate and build, reporting missing parts at runtime.
    pub fn try_build(self) -> Result<AccelEndstop> {
        let board = self
            .board
            .ok_or_else(|| eyre::Report::new(BuildError::MissingBoard))?;
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let dispatch = self
            .dispatch
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDispatch))?;
        let timeouts = self.timeouts.unwrap_or_default();
        validate_timeouts(&timeouts)?;

        let criterion: Box<dyn TriggerCriterion> = match self.criterion {
            Some(c) => c,
            None => {
                let homing = self.homing.unwrap_or_default();
                if homing.fallback_after.is_zero() {
                    return Err(eyre::Report::new(BuildError::InvalidConfig(
                        "fallback trigger bound must be > 0",
                    )));
                }
                let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
                    Some(c) => c,
                    None => Arc::new(MonotonicClock::new()),
                };
                Box::new(ElapsedFallback::new(clock, homing.fallback_after))
            }
        };

        let dispatcher = TriggerDispatcher::new(dispatch, timeouts);
        Ok(AccelEndstop::from_parts(board, sensor, dispatcher, criterion))
    }
}

impl EndstopBuilder<Set, Set, Set> {
    pub fn build(self) -> Result<AccelEndstop> {
        self.try_build()
    }
}
