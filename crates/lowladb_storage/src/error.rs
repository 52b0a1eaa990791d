//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A document with the same `_id` already exists in the namespace.
    #[error("duplicate key: document {id} already exists in {namespace}")]
    DuplicateKey {
        /// The namespace written to.
        namespace: String,
        /// The conflicting `_id`.
        id: String,
    },

    /// The filter could not be evaluated.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The update could not be applied to the matched document.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// The store is closed.
    #[error("storage is closed")]
    Closed,

    /// Failure reported by a foreign storage engine, passed through as-is.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Creates an invalid update error.
    pub fn invalid_update(message: impl Into<String>) -> Self {
        Self::InvalidUpdate(message.into())
    }
}
