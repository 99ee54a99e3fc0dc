use crate::endstop::HomingEndstop;
use crate::error::{BuildError, ProbeError, Result};
use crate::probe::{HomingMove, ProbeController};
use crate::status::HomingOutcome;
use std::time::Duration;

/// Shape of a multi-probe sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbePlan {
    /// Attempts in the sequence.
    pub samples: u32,
    /// Print time at which the first move starts.
    pub start_print_time: f64,
    /// Planned length of each homing move, in print time.
    pub move_time: f64,
    /// Print time between the end of one move and the start of the next.
    pub settle_time: f64,
    pub sample_time: f64,
    pub sample_count: u32,
    pub rest_time: f64,
    /// Wall time the move is given before `home_wait`; a trigger ends it early.
    pub dwell: Duration,
}

impl Default for ProbePlan {
    fn default() -> Self {
        Self {
            samples: 1,
            start_print_time: 1.0,
            move_time: 2.0,
            settle_time: 0.5,
            sample_time: 0.0,
            sample_count: 0,
            rest_time: 0.001,
            dwell: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub index: u32,
    /// Runs of this attempt, including comms-failure retries.
    pub tries: u32,
    pub outcome: HomingOutcome,
    /// Probe z position when triggered.
    pub position: Option<f64>,
}

/// Run a whole multi-probe sequence.
///
/// An attempt that ends in a comms failure is re-run up to `retries` times
/// before the sequence aborts with `ProbeError::CommsTimeout`. `interrupted`
/// is polled before every run. The mechanism's end-of-sequence retract runs
/// on every exit path.
pub fn run_sequence<E: HomingEndstop>(
    probe: &mut ProbeController<E>,
    plan: &ProbePlan,
    retries: u32,
    interrupted: &dyn Fn() -> bool,
) -> Result<Vec<AttemptReport>> {
    if plan.samples == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "sequence needs at least one sample",
        )));
    }
    if !(plan.move_time.is_finite() && plan.move_time > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "move_time must be > 0",
        )));
    }

    probe.multi_probe_begin();
    let result = run_attempts(probe, plan, retries, interrupted);
    let ended = probe.multi_probe_end();
    match (result, ended) {
        (Ok(reports), Ok(())) => Ok(reports),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(e), Err(end)) => {
            tracing::warn!(error = %end, "retract after failed sequence also failed");
            Err(e)
        }
    }
}

fn run_attempts<E: HomingEndstop>(
    probe: &mut ProbeController<E>,
    plan: &ProbePlan,
    retries: u32,
    interrupted: &dyn Fn() -> bool,
) -> Result<Vec<AttemptReport>> {
    let mut reports = Vec::with_capacity(plan.samples as usize);
    let mut print_time = plan.start_print_time;
    for index in 0..plan.samples {
        let mut tries = 0u32;
        let outcome = loop {
            if interrupted() {
                tracing::warn!(index, "probe sequence interrupted");
                return Err(eyre::Report::new(ProbeError::Interrupted));
            }
            tries += 1;
            let hmove = HomingMove {
                print_time,
                end_time: print_time + plan.move_time,
            };
            print_time = hmove.end_time + plan.settle_time;

            let outcome = run_attempt(probe, plan, &hmove)?;
            if outcome != HomingOutcome::CommsFailure {
                break outcome;
            }
            if tries > retries {
                tracing::error!(index, tries, "comms failure; retry budget exhausted");
                return Err(eyre::Report::new(ProbeError::CommsTimeout));
            }
            tracing::warn!(index, tries, "comms failure; retrying attempt");
        };
        let position = outcome
            .is_triggered()
            .then(|| probe.get_position_endstop());
        tracing::info!(index, tries, outcome = outcome.label(), ?position, "probe attempt finished");
        reports.push(AttemptReport {
            index,
            tries,
            outcome,
            position,
        });
    }
    Ok(reports)
}

fn run_attempt<E: HomingEndstop>(
    probe: &mut ProbeController<E>,
    plan: &ProbePlan,
    hmove: &HomingMove,
) -> Result<HomingOutcome> {
    probe.probe_prepare(hmove)?;
    let homed = home(probe, plan, hmove);
    let value = match homed {
        Ok(v) => v,
        Err(e) => {
            if let Err(f) = probe.probe_finish(hmove) {
                tracing::warn!(error = %f, "retract after failed attempt also failed");
            }
            return Err(e);
        }
    };
    probe.probe_finish(hmove)?;
    Ok(HomingOutcome::from_wait_result(value))
}

fn home<E: HomingEndstop>(
    probe: &mut ProbeController<E>,
    plan: &ProbePlan,
    hmove: &HomingMove,
) -> Result<f64> {
    let completion = probe.home_start(
        hmove.print_time,
        plan.sample_time,
        plan.sample_count,
        plan.rest_time,
    )?;
    // The move is in flight while the sensor streams; a trigger ends it early.
    let _ = completion.wait_timeout(plan.dwell);
    probe.home_wait(hmove.end_time)
}
