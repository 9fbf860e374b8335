/// Build history error types
use std::path::PathBuf;
use thiserror::Error;

pub type HistoryResult<T> = Result<T, HistoryError>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output directory not found: {0}")]
    OutputDirNotFound(PathBuf),

    #[error("Output filename conflict: {output} would be produced from {existing} and {incoming}")]
    OutputConflict {
        output: PathBuf,
        existing: PathBuf,
        incoming: PathBuf,
    },

    #[error("Malformed history journal {path}: {reason}")]
    MalformedJournal { path: PathBuf, reason: String },

    #[error("Failed to serialize history: {0}")]
    Serialization(String),

    #[error("Failed to read configuration at {path}: {error}")]
    ConfigRead { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl HistoryError {
    /// Create an invalid argument error naming the offending argument
    pub fn invalid_argument(name: &str) -> Self {
        Self::InvalidArgument(format!("{} must not be empty", name))
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a malformed journal error
    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedJournal {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration read error
    pub fn config_read(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::ConfigRead {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an output conflict error
    pub fn conflict(
        output: impl Into<PathBuf>,
        existing: impl Into<PathBuf>,
        incoming: impl Into<PathBuf>,
    ) -> Self {
        Self::OutputConflict {
            output: output.into(),
            existing: existing.into(),
            incoming: incoming.into(),
        }
    }
}
