//! Human-readable error descriptions and structured JSON error formatting.

use probe_core::error::{BuildError, ProbeError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBoard => {
                "What happened: No board was provided for the probe's trigger channel.\nLikely causes: The accelerometer's board was not wired into the builder.\nHow to fix: Pass the sensor's board via with_board(...).".to_string()
            }
            BuildError::MissingSensor => {
                "What happened: No accelerometer was provided to the probe.\nLikely causes: The sensor failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingDispatch => {
                "What happened: No trigger dispatch context was provided.\nLikely causes: The cross-board dispatcher was not wired into the builder.\nHow to fix: Pass one via with_dispatch(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [homing] or [trsync].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<ProbeError>() {
        return match pe {
            ProbeError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: A missing section, a name that does not match, or an out-of-range value.\nHow to fix: Edit the TOML config and try again."
            ),
            ProbeError::ToolheadMoved(kind) => format!(
                "What happened: The toolhead moved while the probe {kind} script ran.\nLikely causes: The script contains a G0/G1 move.\nHow to fix: Remove motion from {kind}; deploy and retract must leave the toolhead where it is."
            ),
            ProbeError::CommsTimeout => {
                "What happened: A board stopped talking to the host during homing.\nLikely causes: Loose cable, overloaded host, or a board reset mid-move.\nHow to fix: Check the board connections; raise homing.retries or trsync.multi_board_timeout_s if the link is slow.".to_string()
            }
            ProbeError::Timeout => {
                "What happened: The accelerometer did not respond in time.\nLikely causes: Sensor not wired correctly, no power, or wrong bus settings.\nHow to fix: Check the sensor wiring and the [[sensor]] entry, then rerun.".to_string()
            }
            ProbeError::Interrupted => {
                "What happened: The probe sequence was interrupted.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Rerun the command when ready.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file could not be parsed.\nLikely causes: TOML syntax error or a missing required key.\nHow to fix: Fix the config and rerun. Parser said: {}",
            te.message()
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    if msg.to_ascii_lowercase().contains("read config") {
        let cause = err.source().map(|s| format!(" ({s})")).unwrap_or_default();
        return format!(
            "What happened: The config file could not be read{cause}.\nLikely causes: Wrong path passed to --config.\nHow to fix: Point --config at an existing TOML file."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<toml::de::Error>().is_some()
    {
        return 2;
    }
    match err.downcast_ref::<ProbeError>() {
        Some(ProbeError::Config(_)) => 2,
        Some(ProbeError::CommsTimeout) => 3,
        Some(ProbeError::ToolheadMoved(_)) => 4,
        Some(ProbeError::Timeout | ProbeError::Hardware(_) | ProbeError::HardwareFault(_)) => 5,
        Some(ProbeError::State(_)) => 6,
        Some(ProbeError::Interrupted) => 130,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<toml::de::Error>().is_some()
    {
        return "Config";
    }
    match err.downcast_ref::<ProbeError>() {
        Some(ProbeError::Config(_)) => "Config",
        Some(ProbeError::ToolheadMoved(_)) => "ToolheadMoved",
        Some(ProbeError::Hardware(_)) => "Hardware",
        Some(ProbeError::HardwareFault(_)) => "HardwareFault",
        Some(ProbeError::CommsTimeout) => "CommsTimeout",
        Some(ProbeError::Timeout) => "Timeout",
        Some(ProbeError::State(_)) => "State",
        Some(ProbeError::Interrupted) => "Interrupted",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(ProbeError::ToolheadMoved(kind)) = err.downcast_ref::<ProbeError>() {
        obj["details"] = json!({ "script": kind.config_key() });
    }
    obj.to_string()
}
