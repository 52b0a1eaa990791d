//! Error types for the sync engine.

use lowladb_core::CoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The transport could not deliver a payload.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether the fetch can be retried.
        retryable: bool,
    },

    /// The payload is not a valid sync batch.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The local database rejected an operation.
    #[error("database error: {0}")]
    Core(#[from] CoreError),

    /// A batch failed after some of its changes were applied.
    ///
    /// Pages before `pages_applied` remain applied; the sequence was not
    /// advanced.
    #[error("sync aborted after {pages_applied} page(s): {source}")]
    Aborted {
        /// Number of pages fully applied before the failure.
        pages_applied: usize,
        /// The failure that stopped the batch.
        source: Box<SyncError>,
    },

    /// The engine cannot start from its current phase.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current phase.
        from: String,
        /// Requested operation.
        to: String,
    },

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Creates a retryable network error.
    pub fn network_retryable(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Wraps a failure that interrupted a partially applied batch.
    pub fn aborted(pages_applied: usize, source: SyncError) -> Self {
        Self::Aborted {
            pages_applied,
            source: Box::new(source),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network { retryable: true, .. })
    }

    /// Returns true for transport and payload failures.
    pub fn is_network(&self) -> bool {
        matches!(self, SyncError::Network { .. } | SyncError::Protocol(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::network_retryable("connection lost").is_retryable());
        assert!(!SyncError::network_fatal("Invalid URL").is_retryable());
        assert!(!SyncError::protocol("bad json").is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::aborted(1, SyncError::network_retryable("x")).is_retryable());
    }

    #[test]
    fn error_display_carries_cause() {
        let err = SyncError::network_fatal("Invalid URL");
        assert_eq!(err.to_string(), "network error: Invalid URL");

        let err = SyncError::aborted(2, SyncError::Core(CoreError::Closed));
        let msg = err.to_string();
        assert!(msg.contains("2 page(s)"));
        assert!(msg.contains("closed"));
    }

    #[test]
    fn aborted_exposes_source() {
        use std::error::Error as _;
        let err = SyncError::aborted(0, SyncError::protocol("truncated"));
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("protocol error: truncated"));
    }
}
