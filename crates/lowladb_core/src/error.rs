//! Error types for LowlaDB core.

use lowladb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// A caller-supplied document, update or name was rejected before any
/// storage mutation took place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field name starts with `$`, which is reserved for operators.
    #[error("invalid field name {field}: names starting with '$' are reserved")]
    ReservedFieldName {
        /// The offending field name.
        field: String,
    },

    /// An update mixes `$` operators with plain field keys.
    #[error("cannot mix update operators and plain fields in one update")]
    MixedUpdate,

    /// An update operator that is not supported.
    #[error("unknown update operator {operator}")]
    UnknownOperator {
        /// The operator as written.
        operator: String,
    },

    /// An update that is structurally wrong.
    #[error("malformed update: {message}")]
    MalformedUpdate {
        /// Description of the problem.
        message: String,
    },

    /// An operator update tried to change `_id`.
    #[error("cannot modify _id")]
    ImmutableId,

    /// A document carries an `_id` that is not a string.
    #[error("invalid _id: {message}")]
    InvalidId {
        /// Description of the problem.
        message: String,
    },

    /// A namespace with an empty database or collection part.
    #[error("invalid namespace {namespace:?}")]
    InvalidNamespace {
        /// The namespace as given.
        namespace: String,
    },
}

impl ValidationError {
    /// Creates a reserved field name error.
    pub fn reserved(field: impl Into<String>) -> Self {
        Self::ReservedFieldName {
            field: field.into(),
        }
    }

    /// Creates a malformed update error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedUpdate {
            message: message.into(),
        }
    }
}

/// Errors that can occur in LowlaDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input was rejected before reaching storage.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The handle has been closed.
    #[error("database is closed")]
    Closed,
}

impl CoreError {
    /// Returns true if this is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_field_display_names_field() {
        let err = CoreError::from(ValidationError::reserved("$bad"));
        assert!(err.to_string().contains("$bad"));
        assert!(err.is_validation());
    }

    #[test]
    fn storage_error_converts() {
        let err: CoreError = StorageError::Backend("boom".into()).into();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn unknown_operator_display() {
        let err = ValidationError::UnknownOperator {
            operator: "$push".into(),
        };
        assert_eq!(err.to_string(), "unknown update operator $push");
    }
}
