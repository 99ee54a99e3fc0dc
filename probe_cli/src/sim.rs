//! Simulated machine assembly: config mapping, board wiring, and fault knobs.

use eyre::WrapErr;
use probe_config::Config;
use probe_core::error::{ProbeError, Result};
use probe_core::{AccelEndstop, ActivationScripts, InitSequence, ProbeController};
use probe_hardware::{SimAccel, SimBehavior, SimBoard, SimDispatch, SimKinematics, SimScript, SimStepper, SimToolhead};
use probe_traits::{Board, Stepper, Toolhead};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Fault injection read from `PROBE_SIM_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimKnobs {
    /// Behaviour of the faulty board's trigger channel.
    pub behavior: SimBehavior,
    /// Board that gets `behavior`; defaults to the probe sensor's board.
    pub board: Option<String>,
    /// Every board runs in dry-run mode.
    pub fileoutput: bool,
    /// The accelerometer refuses to start.
    pub sensor_fail: bool,
}

impl SimKnobs {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let after = match get("PROBE_SIM_AFTER_MS") {
            Some(ms) => Duration::from_millis(ms.trim().parse().map_err(|_| {
                eyre::Report::new(ProbeError::Config(format!(
                    "PROBE_SIM_AFTER_MS must be whole milliseconds, got '{ms}'"
                )))
            })?),
            None => Duration::ZERO,
        };
        let behavior = match get("PROBE_SIM_BEHAVIOR").as_deref().map(str::trim) {
            None | Some("" | "quiet") => SimBehavior::Quiet,
            Some("hit") => SimBehavior::EndstopHit { after },
            Some("comms") => SimBehavior::CommsTimeout { after },
            Some(other) => {
                return Err(eyre::Report::new(ProbeError::Config(format!(
                    "PROBE_SIM_BEHAVIOR must be quiet|hit|comms, got '{other}'"
                ))));
            }
        };
        Ok(Self {
            behavior,
            board: get("PROBE_SIM_BOARD").filter(|b| !b.trim().is_empty()),
            fileoutput: flag(get("PROBE_SIM_FILEOUTPUT")),
            sensor_fail: flag(get("PROBE_SIM_SENSOR_FAIL")),
        })
    }
}

fn flag(v: Option<String>) -> bool {
    matches!(v.as_deref(), Some("1" | "true" | "yes"))
}

/// A probe wired to simulated boards, ready for the identify phase.
pub struct SimMachine {
    pub probe: ProbeController<AccelEndstop>,
    pub kinematics: SimKinematics,
    pub boards: Vec<Arc<SimBoard>>,
}

impl SimMachine {
    /// Bind the configured z steppers to the probe. Returns how many were bound.
    pub fn identify(&mut self) -> Result<usize> {
        let before = self.probe.endstop().dispatcher().steppers().len();
        {
            let mut init = InitSequence::new();
            self.probe.register_events(&mut init);
            init.run_identify(&self.kinematics)
                .wrap_err("board identify failed")?;
        }
        Ok(self.probe.endstop().dispatcher().steppers().len() - before)
    }
}

pub fn assemble(cfg: &Config, knobs: &SimKnobs) -> Result<SimMachine> {
    let sensor_cfg = cfg.probe_sensor().ok_or_else(|| {
        eyre::Report::new(ProbeError::Config(format!(
            "probe.accel_chip '{}' does not match any [[sensor]]",
            cfg.probe.accel_chip
        )))
    })?;
    let faulty = knobs.board.as_deref().unwrap_or(sensor_cfg.board.as_str());

    let mut boards: HashMap<&str, Arc<SimBoard>> = HashMap::new();
    let mut ordered = Vec::new();
    for name in cfg.board_names() {
        let frequency = cfg.board(name).map_or(16_000_000.0, |b| b.frequency);
        let behavior = if name == faulty {
            knobs.behavior
        } else {
            SimBehavior::Quiet
        };
        let board = Arc::new(
            SimBoard::new(name, frequency)
                .with_fileoutput(knobs.fileoutput)
                .with_behavior(behavior),
        );
        tracing::debug!(board = name, frequency, ?behavior, "sim board ready");
        boards.insert(name, Arc::clone(&board));
        ordered.push(board);
    }
    let lookup = |name: &str| -> Result<Arc<dyn Board>> {
        boards
            .get(name)
            .map(|b| Arc::clone(b) as Arc<dyn Board>)
            .ok_or_else(|| {
                eyre::Report::new(ProbeError::Config(format!("unknown board '{name}'")))
            })
    };

    let accel = SimAccel::new(&sensor_cfg.name, sensor_cfg.rate_hz, sensor_cfg.batch_size)
        .with_fail_on_start(knobs.sensor_fail);
    let endstop = AccelEndstop::builder()
        .with_board(lookup(&sensor_cfg.board)?)
        .with_sensor(accel)
        .with_dispatch(SimDispatch::new())
        .with_timeouts((&cfg.trsync).into())
        .with_homing((&cfg.homing).into())
        .try_build()?;

    let sim_toolhead = Arc::new(SimToolhead::default());
    let toolhead: Arc<dyn Toolhead> = sim_toolhead.clone();
    let scripts = ActivationScripts {
        activate: Box::new(SimScript::new(
            "activate_gcode",
            &cfg.probe.activate_gcode,
            Arc::clone(&sim_toolhead),
        )),
        deactivate: Box::new(SimScript::new(
            "deactivate_gcode",
            &cfg.probe.deactivate_gcode,
            sim_toolhead,
        )),
    };
    let probe = ProbeController::new(endstop, (&cfg.probe).into(), toolhead, scripts);

    let mut steppers: Vec<Arc<dyn Stepper>> = Vec::with_capacity(cfg.steppers.len());
    for s in &cfg.steppers {
        let axes: Vec<char> = s.axes.iter().filter_map(|a| a.chars().next()).collect();
        steppers.push(Arc::new(SimStepper::new(&s.name, lookup(&s.board)?, &axes)));
    }

    Ok(SimMachine {
        probe,
        kinematics: SimKinematics::new(steppers),
        boards: ordered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knobs(pairs: &[(&str, &str)]) -> Result<SimKnobs> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SimKnobs::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_are_a_quiet_healthy_machine() {
        assert_eq!(knobs(&[]).unwrap(), SimKnobs::default());
    }

    #[test]
    fn behavior_and_delay_are_parsed() {
        let k = knobs(&[("PROBE_SIM_BEHAVIOR", "comms"), ("PROBE_SIM_AFTER_MS", "15")]).unwrap();
        assert_eq!(
            k.behavior,
            SimBehavior::CommsTimeout {
                after: Duration::from_millis(15)
            }
        );
        let k = knobs(&[("PROBE_SIM_FILEOUTPUT", "1"), ("PROBE_SIM_BOARD", "aux")]).unwrap();
        assert!(k.fileoutput);
        assert_eq!(k.board.as_deref(), Some("aux"));
    }

    #[test]
    fn bad_knobs_are_config_errors() {
        for pairs in [
            &[("PROBE_SIM_BEHAVIOR", "explode")][..],
            &[("PROBE_SIM_AFTER_MS", "soon")][..],
        ] {
            let err = knobs(pairs).expect_err("rejected");
            assert!(matches!(
                err.downcast_ref::<ProbeError>(),
                Some(ProbeError::Config(_))
            ));
        }
    }

    #[test]
    fn assembly_binds_only_z_steppers_to_the_probe() {
        let cfg = probe_config::load_toml(
            r#"
[probe]
z_offset = 0.5
accel_chip = "adxl345"

[[sensor]]
name = "adxl345"
board = "toolboard"

[[stepper]]
name = "stepper_x"
board = "mcu"
axes = ["x"]

[[stepper]]
name = "stepper_z"
board = "mcu"
axes = ["z"]
"#,
        )
        .unwrap();
        let mut m = assemble(&cfg, &SimKnobs::default()).unwrap();
        assert_eq!(m.boards.len(), 2);
        assert_eq!(m.identify().unwrap(), 1);
        let channels: Vec<&str> = m
            .probe
            .endstop()
            .dispatcher()
            .channels()
            .iter()
            .map(|c| c.board_name())
            .collect();
        assert_eq!(channels, vec!["toolboard", "mcu"]);
    }
}
