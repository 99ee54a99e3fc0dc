use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("sensor {0} is already acquiring")]
    Busy(String),
    #[error("sensor {0} has no sample sink attached")]
    NotAttached(String),
    #[error("activation script: {0}")]
    Script(String),
    #[error("board communication timeout")]
    Timeout,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
