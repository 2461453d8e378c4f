use std::path::PathBuf;

use thiserror::Error;

/// Broad failure categories surfaced to callers and to the serving form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Upstream,
}

/// Error type shared by every component of the crate.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RiskError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        RiskError::InvalidState(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        RiskError::Upstream(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RiskError::NotFound(_) => ErrorKind::NotFound,
            RiskError::InvalidState(_) => ErrorKind::InvalidState,
            RiskError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            RiskError::Upstream(_) | RiskError::Io(_) | RiskError::Csv(_) | RiskError::Json(_) => {
                ErrorKind::Upstream
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
