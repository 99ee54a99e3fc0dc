use thiserror::Error;

/// Which activation script a toolhead-integrity check was guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Activate,
    Deactivate,
}

impl ScriptKind {
    pub fn config_key(self) -> &'static str {
        match self {
            ScriptKind::Activate => "activate_gcode",
            ScriptKind::Deactivate => "deactivate_gcode",
        }
    }
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_key())
    }
}

#[derive(Debug, Error, Clone)]
pub enum ProbeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("toolhead moved during probe {0} script")]
    ToolheadMoved(ScriptKind),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("communication timeout during homing")]
    CommsTimeout,
    #[error("timeout waiting for hardware")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("interrupted")]
    Interrupted,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing board")]
    MissingBoard,
    #[error("missing accelerometer")]
    MissingSensor,
    #[error("missing trigger dispatch context")]
    MissingDispatch,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
