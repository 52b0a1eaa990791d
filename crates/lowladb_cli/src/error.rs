//! CLI error type.

use lowladb::{CoreError, SyncError, ValidationError};
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A batch file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Loading or decoding the batch failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A database operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A namespace or name argument was invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Output could not be serialized.
    #[error("cannot format output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
