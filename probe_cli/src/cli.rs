//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "probe", version, about = "Accelerometer homing probe CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/probe_config.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON, and log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a multi-probe sequence against the simulated machine
    Probe {
        /// Attempts in the sequence
        #[arg(long, default_value_t = 1)]
        samples: u32,
        /// Override homing.retries from the config
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
        /// Wall time each homing move is given before the host waits on it
        #[arg(long = "dwell-ms", value_name = "MS", default_value_t = 50)]
        dwell_ms: u64,
    },
    /// Report the endstop state and position offset
    Query,
    /// Build the machine, bind steppers, and list trigger channels
    SelfCheck,
}
