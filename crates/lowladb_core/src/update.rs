//! Validation of caller-supplied documents and update specifications.
//!
//! Everything here runs before storage is touched, so a rejected insert or
//! modification has no side effects.

use crate::error::ValidationError;
use lowladb_storage::{Document, UpdateOp, UpdateSpec, ID_FIELD};
use serde_json::Value;

/// Checks that no top-level field of `doc` starts with `$` and that `_id`,
/// when present, is a string.
///
/// # Errors
///
/// Returns [`ValidationError::ReservedFieldName`] naming the first offending
/// field, or [`ValidationError::InvalidId`].
pub fn validate_document(doc: &Document) -> Result<(), ValidationError> {
    if let Some(field) = doc.keys().find(|k| k.starts_with('$')) {
        return Err(ValidationError::reserved(field.as_str()));
    }
    match doc.get(ID_FIELD) {
        None | Some(Value::String(_)) => Ok(()),
        Some(other) => Err(ValidationError::InvalidId {
            message: format!("expected a string, found {other}"),
        }),
    }
}

/// Parses an update document into a validated [`UpdateSpec`].
///
/// A document whose keys all start with `$` is an operator update; one with
/// no `$` keys is a full replacement. An empty document replaces every field
/// except `_id`.
///
/// # Errors
///
/// - [`ValidationError::MixedUpdate`] when operator and plain keys are mixed
/// - [`ValidationError::UnknownOperator`] for operators other than `$set`,
///   `$unset` and `$inc`
/// - [`ValidationError::ReservedFieldName`] when `$set` introduces a field
///   name starting with `$`
/// - [`ValidationError::ImmutableId`] when an operator targets `_id`
/// - [`ValidationError::MalformedUpdate`] for operands of the wrong shape
pub fn parse_update(update: &Document) -> Result<UpdateSpec, ValidationError> {
    let operators = update.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return Ok(UpdateSpec::Replace(update.clone()));
    }
    if operators != update.len() {
        return Err(ValidationError::MixedUpdate);
    }

    let mut ops = Vec::new();
    for (operator, operand) in update {
        let kind = match operator.as_str() {
            "$set" => Operator::Set,
            "$unset" => Operator::Unset,
            "$inc" => Operator::Inc,
            _ => {
                return Err(ValidationError::UnknownOperator {
                    operator: operator.clone(),
                })
            }
        };
        let fields = operand.as_object().ok_or_else(|| {
            ValidationError::malformed(format!("{operator} requires an object, found {operand}"))
        })?;
        for (path, value) in fields {
            check_path(path)?;
            let op = match kind {
                Operator::Set => {
                    if let Some(field) = reserved_key_in(value) {
                        return Err(ValidationError::reserved(field));
                    }
                    UpdateOp::Set {
                        path: path.clone(),
                        value: value.clone(),
                    }
                }
                Operator::Unset => UpdateOp::Unset { path: path.clone() },
                Operator::Inc => match value {
                    Value::Number(by) => UpdateOp::Inc {
                        path: path.clone(),
                        by: by.clone(),
                    },
                    other => {
                        return Err(ValidationError::malformed(format!(
                            "$inc of {path} requires a number, found {other}"
                        )))
                    }
                },
            };
            ops.push(op);
        }
    }
    Ok(UpdateSpec::Operators(ops))
}

#[derive(Clone, Copy)]
enum Operator {
    Set,
    Unset,
    Inc,
}

fn check_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ValidationError::malformed(format!(
            "invalid field path {path:?}"
        )));
    }
    if let Some(segment) = path.split('.').find(|s| s.starts_with('$')) {
        return Err(ValidationError::reserved(segment));
    }
    if path == ID_FIELD || path.starts_with("_id.") {
        return Err(ValidationError::ImmutableId);
    }
    Ok(())
}

fn reserved_key_in(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, nested)| {
            if key.starts_with('$') {
                Some(key.as_str())
            } else {
                reserved_key_in(nested)
            }
        }),
        Value::Array(items) => items.iter().find_map(reserved_key_in),
        _ => None,
    }
}
