#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the accelerometer homing probe.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `accel_chip` in `[probe]` must name one of the `[[sensor]]` entries; the
//!   probe's authoritative trigger channel lives on that sensor's board.
use serde::Deserialize;

/// `[probe]`: the mechanism and its position offset.
#[derive(Debug, Deserialize)]
pub struct ProbeSection {
    /// Z position reported to the motion system when the probe triggers.
    pub z_offset: f64,
    /// Name of the `[[sensor]]` used for trigger detection.
    pub accel_chip: String,
    /// Retract after every attempt instead of once per multi-probe sequence.
    #[serde(default = "default_true")]
    pub deactivate_on_each_sample: bool,
    #[serde(default)]
    pub activate_gcode: String,
    #[serde(default)]
    pub deactivate_gcode: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HomingCfg {
    /// Host-side fallback: force a trigger once this much wall time has
    /// passed since `home_start` while samples keep arriving.
    pub fallback_trigger_s: f64,
    /// Attempts re-run after a comms timeout before the sequence aborts.
    pub retries: u32,
}

impl Default for HomingCfg {
    fn default() -> Self {
        Self {
            fallback_trigger_s: 8.0,
            retries: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrsyncCfg {
    /// Expiry used when only one board takes part in homing.
    pub single_board_timeout_s: f64,
    /// Expiry used when several boards must agree on the trigger.
    pub multi_board_timeout_s: f64,
}

impl Default for TrsyncCfg {
    fn default() -> Self {
        Self {
            single_board_timeout_s: 0.025,
            multi_board_timeout_s: 0.250,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SensorCfg {
    pub name: String,
    pub board: String,
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,
    /// Samples per delivered batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_rate_hz() -> u32 {
    400
}

fn default_batch_size() -> usize {
    8
}

#[derive(Debug, Deserialize)]
pub struct StepperCfg {
    pub name: String,
    pub board: String,
    /// Axes this stepper drives, e.g. `["z"]` or `["x", "y"]` for corexy.
    pub axes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BoardCfg {
    pub name: String,
    /// Board clock frequency in Hz.
    #[serde(default = "default_frequency")]
    pub frequency: f64,
}

fn default_frequency() -> f64 {
    16_000_000.0
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub probe: ProbeSection,
    #[serde(default)]
    pub homing: HomingCfg,
    #[serde(default)]
    pub trsync: TrsyncCfg,
    #[serde(default, rename = "board")]
    pub boards: Vec<BoardCfg>,
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorCfg>,
    #[serde(default, rename = "stepper")]
    pub steppers: Vec<StepperCfg>,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// The sensor named by `probe.accel_chip`, if configured.
    pub fn probe_sensor(&self) -> Option<&SensorCfg> {
        self.sensors.iter().find(|s| s.name == self.probe.accel_chip)
    }

    pub fn board(&self, name: &str) -> Option<&BoardCfg> {
        self.boards.iter().find(|b| b.name == name)
    }

    /// Every board name referenced anywhere, in first-mention order.
    pub fn board_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mentioned = self
            .boards
            .iter()
            .map(|b| b.name.as_str())
            .chain(self.sensors.iter().map(|s| s.board.as_str()))
            .chain(self.steppers.iter().map(|s| s.board.as_str()));
        for n in mentioned {
            if !names.contains(&n) {
                names.push(n);
            }
        }
        names
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Probe
        if !self.probe.z_offset.is_finite() {
            eyre::bail!("probe.z_offset must be a finite number");
        }
        if self.probe.accel_chip.trim().is_empty() {
            eyre::bail!("probe.accel_chip must not be empty");
        }
        if self.probe_sensor().is_none() {
            eyre::bail!(
                "probe.accel_chip '{}' does not match any [[sensor]] name",
                self.probe.accel_chip
            );
        }

        // Homing
        if !(self.homing.fallback_trigger_s.is_finite() && self.homing.fallback_trigger_s > 0.0) {
            eyre::bail!("homing.fallback_trigger_s must be > 0");
        }
        if self.homing.retries > 10 {
            eyre::bail!("homing.retries is unreasonably large (>10)");
        }

        // Trsync
        let single = self.trsync.single_board_timeout_s;
        let multi = self.trsync.multi_board_timeout_s;
        if !(single.is_finite() && single > 0.0) {
            eyre::bail!("trsync.single_board_timeout_s must be > 0");
        }
        if !(multi.is_finite() && multi > 0.0) {
            eyre::bail!("trsync.multi_board_timeout_s must be > 0");
        }
        if single > multi {
            eyre::bail!(
                "trsync.single_board_timeout_s must not exceed trsync.multi_board_timeout_s"
            );
        }

        // Boards
        for (i, b) in self.boards.iter().enumerate() {
            if b.name.trim().is_empty() {
                eyre::bail!("board[{i}].name must not be empty");
            }
            if !(b.frequency.is_finite() && b.frequency > 0.0) {
                eyre::bail!("board '{}' frequency must be > 0", b.name);
            }
            if self.boards[..i].iter().any(|o| o.name == b.name) {
                eyre::bail!("board '{}' is declared twice", b.name);
            }
        }

        // Sensors
        for s in &self.sensors {
            if s.rate_hz == 0 {
                eyre::bail!("sensor '{}' rate_hz must be > 0", s.name);
            }
            if s.batch_size == 0 {
                eyre::bail!("sensor '{}' batch_size must be >= 1", s.name);
            }
            if s.board.trim().is_empty() {
                eyre::bail!("sensor '{}' board must not be empty", s.name);
            }
        }

        // Steppers
        for s in &self.steppers {
            if s.name.trim().is_empty() {
                eyre::bail!("stepper name must not be empty");
            }
            if s.board.trim().is_empty() {
                eyre::bail!("stepper '{}' board must not be empty", s.name);
            }
            if s.axes.is_empty() {
                eyre::bail!("stepper '{}' must drive at least one axis", s.name);
            }
            for a in &s.axes {
                if !matches!(a.as_str(), "x" | "y" | "z") {
                    eyre::bail!("stepper '{}' has unknown axis '{a}'", s.name);
                }
            }
        }

        // Logging
        if let Some(rot) = &self.logging.rotation
            && !matches!(rot.as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
