//! Probe mechanism sequencing around homing attempts.
//!
//! The controller deploys the mechanism before an attempt and retracts it
//! afterwards. In a multi-probe sequence with `deactivate_on_each_sample`
//! turned off it deploys once on the first attempt and retracts once at the
//! end. Every script run is checked against the toolhead position.

use crate::config::ProbeCfg;
use crate::endstop::HomingEndstop;
use crate::error::{ProbeError, Result, ScriptKind};
use crate::events::{InitSequence, McuIdentify};
use crate::hw_error::report;
use probe_traits::{ActivationScript, Board, Completion, Stepper, Toolhead};
use std::sync::Arc;

/// Multi-probe state of the mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeState {
    /// Not deployed; deploy and retract around each attempt.
    #[default]
    Off,
    /// A sequence has begun; the next attempt deploys.
    First,
    /// Deployed until the sequence ends.
    On,
}

/// The planner's view of one homing move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomingMove {
    /// Print time at which the move starts.
    pub print_time: f64,
    /// Print time at which the move is planned to end.
    pub end_time: f64,
}

/// Deploy and retract scripts.
pub struct ActivationScripts {
    pub activate: Box<dyn ActivationScript>,
    pub deactivate: Box<dyn ActivationScript>,
}

pub struct ProbeController<E> {
    endstop: E,
    cfg: ProbeCfg,
    toolhead: Arc<dyn Toolhead>,
    scripts: ActivationScripts,
    state: ProbeState,
}

impl<E: std::fmt::Debug> std::fmt::Debug for ProbeController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeController")
            .field("endstop", &self.endstop)
            .field("cfg", &self.cfg)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<E: HomingEndstop> ProbeController<E> {
    pub fn new(
        endstop: E,
        cfg: ProbeCfg,
        toolhead: Arc<dyn Toolhead>,
        scripts: ActivationScripts,
    ) -> Self {
        Self {
            endstop,
            cfg,
            toolhead,
            scripts,
            state: ProbeState::Off,
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn cfg(&self) -> &ProbeCfg {
        &self.cfg
    }

    pub fn endstop(&self) -> &E {
        &self.endstop
    }

    pub fn endstop_mut(&mut self) -> &mut E {
        &mut self.endstop
    }

    pub fn get_position_endstop(&self) -> f64 {
        self.cfg.z_offset
    }

    /// Bind every z stepper announced at board identify time.
    pub fn handle_identify(&mut self, event: &McuIdentify) -> Result<usize> {
        let mut added = 0;
        for stepper in event.steppers.iter().filter(|s| s.is_active_axis('z')) {
            self.endstop.add_stepper(Arc::clone(stepper))?;
            added += 1;
        }
        tracing::debug!(added, "z steppers bound to probe");
        Ok(added)
    }

    /// Listen for the identify phase of `seq`.
    pub fn register_events<'a>(&'a mut self, seq: &mut InitSequence<'a>) {
        seq.on_identify(move |event| self.handle_identify(event).map(|_| ()));
    }

    pub fn multi_probe_begin(&mut self) {
        if self.cfg.deactivate_on_each_sample {
            return;
        }
        self.state = ProbeState::First;
    }

    pub fn multi_probe_end(&mut self) -> Result<()> {
        if self.cfg.deactivate_on_each_sample {
            return Ok(());
        }
        let raised = self.raise_probe();
        self.state = ProbeState::Off;
        raised
    }

    pub fn probe_prepare(&mut self, _hmove: &HomingMove) -> Result<()> {
        if matches!(self.state, ProbeState::Off | ProbeState::First) {
            self.lower_probe()?;
            if self.state == ProbeState::First {
                self.state = ProbeState::On;
            }
        }
        Ok(())
    }

    pub fn probe_finish(&mut self, _hmove: &HomingMove) -> Result<()> {
        if self.state == ProbeState::Off {
            self.raise_probe()?;
        }
        Ok(())
    }

    fn lower_probe(&mut self) -> Result<()> {
        self.run_script(ScriptKind::Activate)
    }

    fn raise_probe(&mut self) -> Result<()> {
        self.run_script(ScriptKind::Deactivate)
    }

    fn run_script(&mut self, kind: ScriptKind) -> Result<()> {
        let before = self.toolhead.get_position();
        let script = match kind {
            ScriptKind::Activate => &mut self.scripts.activate,
            ScriptKind::Deactivate => &mut self.scripts.deactivate,
        };
        script.run().map_err(report)?;
        let after = self.toolhead.get_position();
        if before[..3] != after[..3] {
            tracing::error!(script = %kind, ?before, ?after, "toolhead moved during probe script");
            return Err(eyre::Report::new(ProbeError::ToolheadMoved(kind)));
        }
        tracing::debug!(script = %kind, "probe script ran");
        Ok(())
    }
}

impl<E: HomingEndstop> HomingEndstop for ProbeController<E> {
    fn board(&self) -> Arc<dyn Board> {
        self.endstop.board()
    }

    fn add_stepper(&mut self, stepper: Arc<dyn Stepper>) -> Result<()> {
        self.endstop.add_stepper(stepper)
    }

    fn steppers(&self) -> Vec<Arc<dyn Stepper>> {
        self.endstop.steppers()
    }

    fn home_start(
        &mut self,
        print_time: f64,
        sample_time: f64,
        sample_count: u32,
        rest_time: f64,
    ) -> Result<Completion> {
        self.endstop
            .home_start(print_time, sample_time, sample_count, rest_time)
    }

    fn home_wait(&mut self, home_end_time: f64) -> Result<f64> {
        self.endstop.home_wait(home_end_time)
    }

    fn query_endstop(&self, print_time: f64) -> bool {
        self.endstop.query_endstop(print_time)
    }
}
