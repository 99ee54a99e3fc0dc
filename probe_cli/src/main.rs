mod cli;
mod error_fmt;
mod sim;

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use probe_config::{Config, Logging};
use probe_core::error::{ProbeError, Result};
use probe_core::{AttemptReport, HomingEndstop, ProbePlan, run_sequence};
use probe_traits::Stepper;
use serde_json::json;
use sim::{SimKnobs, SimMachine};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    let _log_guard = init_tracing(cli.json, &cli.log_level, &cfg.logging);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    let knobs = SimKnobs::from_env()?;
    let mut machine = sim::assemble(&cfg, &knobs)?;
    let bound = machine.identify()?;
    tracing::info!(
        sensor = %cfg.probe.accel_chip,
        z_steppers = bound,
        channels = machine.probe.endstop().dispatcher().channels().len(),
        "probe ready"
    );

    match cli.cmd {
        Commands::Probe {
            samples,
            retries,
            dwell_ms,
        } => {
            let plan = ProbePlan {
                samples,
                dwell: Duration::from_millis(dwell_ms),
                ..ProbePlan::default()
            };
            let retries = retries.unwrap_or(cfg.homing.retries);
            let reports = run_sequence(&mut machine.probe, &plan, retries, &|| {
                interrupted.load(Ordering::SeqCst)
            })?;
            print_reports(cli.json, &reports);
        }
        Commands::Query => print_query(cli.json, &machine),
        Commands::SelfCheck => print_self_check(cli.json, &machine),
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let cfg = probe_config::load_toml(&text)?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(ProbeError::Config(e.to_string())))?;
    Ok(cfg)
}

fn console_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console logs go to stderr so stdout stays machine-readable. The optional
/// file sink always writes JSON lines; keep the returned guard alive until
/// exit or buffered lines are lost.
fn init_tracing(json: bool, level: &str, logging: &Logging) -> Option<WorkerGuard> {
    let pretty = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(level))
    });
    let lines = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(level))
    });

    let mut guard = None;
    let file = logging.file.as_deref().and_then(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = path
            .file_name()
            .map_or_else(|| "probe.log".to_string(), |n| n.to_string_lossy().into_owned());
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => Rotation::DAILY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::NEVER,
        };
        let appender = match RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(prefix)
            .build(dir)
        {
            Ok(a) => a,
            Err(e) => {
                eprintln!("Warning: failed to open log file {file}: {e}");
                return None;
            }
        };
        let (writer, g) = tracing_appender::non_blocking(appender);
        guard = Some(g);
        let file_level = logging.level.as_deref().unwrap_or("debug");
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(
                    EnvFilter::try_new(file_level).unwrap_or_else(|_| EnvFilter::new("debug")),
                ),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(pretty)
        .with(lines)
        .with(file)
        .try_init();
    guard
}

fn print_reports(json: bool, reports: &[AttemptReport]) {
    let triggered = reports.iter().filter(|r| r.outcome.is_triggered()).count();
    if json {
        let attempts: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "index": r.index,
                    "tries": r.tries,
                    "outcome": r.outcome.label(),
                    "position": r.position,
                })
            })
            .collect();
        println!(
            "{}",
            json!({ "attempts": attempts, "triggered": triggered })
        );
        return;
    }
    for r in reports {
        match r.position {
            Some(z) => println!(
                "attempt {}: {} (z={z:.3}, tries={})",
                r.index,
                r.outcome.label(),
                r.tries
            ),
            None => println!(
                "attempt {}: {} (tries={})",
                r.index,
                r.outcome.label(),
                r.tries
            ),
        }
    }
    println!("probe complete: {triggered}/{} triggered", reports.len());
}

fn print_query(json: bool, machine: &SimMachine) {
    let probe = &machine.probe;
    let triggered = probe.query_endstop(0.0);
    let state = format!("{:?}", probe.state()).to_ascii_lowercase();
    if json {
        println!(
            "{}",
            json!({
                "triggered": triggered,
                "z_offset": probe.get_position_endstop(),
                "state": state,
            })
        );
    } else {
        println!(
            "probe: {} (z_offset={:.3}, state={state})",
            if triggered { "TRIGGERED" } else { "open" },
            probe.get_position_endstop()
        );
    }
}

fn print_self_check(json: bool, machine: &SimMachine) {
    let endstop = machine.probe.endstop();
    let channels: Vec<_> = endstop
        .dispatcher()
        .channels()
        .iter()
        .map(|c| {
            (
                c.board_name().to_string(),
                c.steppers()
                    .iter()
                    .map(|s| s.name().to_string())
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    if json {
        let list: Vec<_> = channels
            .iter()
            .map(|(board, steppers)| json!({ "board": board, "steppers": steppers }))
            .collect();
        println!(
            "{}",
            json!({
                "sensor": endstop.sensor_name(),
                "boards": machine.boards.len(),
                "channels": list,
            })
        );
        return;
    }
    println!("sensor: {}", endstop.sensor_name());
    for (board, steppers) in &channels {
        println!("channel {board}: [{}]", steppers.join(", "));
    }
    println!("self-check ok: {} channel(s)", channels.len());
}
