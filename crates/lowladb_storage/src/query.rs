//! Reference filter, sort and field-path evaluation.
//!
//! These are the semantics `MemoryStore` executes. A foreign engine standing in
//! for the storage collaborator is expected to produce the same results.

use crate::document::{Document, Filter, SortDirection, SortSpec};
use crate::error::{StorageError, StorageResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;

// ============================================================================
// Value Comparison
// ============================================================================

/// Compares two JSON values.
///
/// Values of different types order by type rank:
/// null < number < string < object < array < bool.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Number(na), Value::Number(nb)) => {
            if let (Some(x), Some(y)) = (na.as_i64(), nb.as_i64()) {
                return x.cmp(&y);
            }
            let fa = na.as_f64().unwrap_or(f64::NAN);
            let fb = nb.as_f64().unwrap_or(f64::NAN);
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        }
        (Value::String(sa), Value::String(sb)) => sa.cmp(sb),
        (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
        (Value::Array(xa), Value::Array(xb)) => {
            for (x, y) in xa.iter().zip(xb.iter()) {
                let cmp = compare_values(x, y);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            xa.len().cmp(&xb.len())
        }
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Compares two possibly-missing field values for sorting.
///
/// A missing value orders after every present value.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

// ============================================================================
// Field Path Resolution
// ============================================================================

/// Gets a nested value using a dot-separated path.
///
/// Numeric segments index into arrays. Returns `None` when any segment is
/// missing or runs through a scalar.
pub fn get_field_value<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Sets the value at a dot path, creating intermediate objects.
///
/// # Errors
///
/// Fails when an intermediate segment exists but is not an object.
pub fn set_field_value(doc: &mut Document, path: &str, value: Value) -> StorageResult<()> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut target: &mut Map<String, Value> = doc;
    if let Some(parents) = parents {
        for part in parents.split('.') {
            let entry = target
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            target = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(StorageError::invalid_update(format!(
                        "cannot set {path}: {part} is not an object ({other})"
                    )))
                }
            };
        }
    }
    target.insert(leaf.to_string(), value);
    Ok(())
}

/// Removes the value at a dot path. Missing paths are ignored.
pub fn unset_field_value(doc: &mut Document, path: &str) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut target: &mut Map<String, Value> = doc;
    if let Some(parents) = parents {
        for part in parents.split('.') {
            target = match target.get_mut(part) {
                Some(Value::Object(map)) => map,
                _ => return,
            };
        }
    }
    target.shift_remove(leaf);
}

// ============================================================================
// Filter Evaluation
// ============================================================================

/// Returns true if `value` is a non-empty object whose keys all start with `$`.
pub fn is_operator_object(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) if !obj.is_empty() => obj.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

/// Evaluates `filter` against `doc`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidQuery`] for unsupported operators or
/// malformed operands.
pub fn matches_filter(doc: &Document, filter: &Filter) -> StorageResult<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => logical_all(doc, condition)?,
            "$or" => logical_any(doc, condition)?,
            "$nor" => !logical_any(doc, condition)?,
            op if op.starts_with('$') => {
                return Err(StorageError::invalid_query(format!(
                    "unsupported top-level operator {op}"
                )))
            }
            path => matches_condition(get_field_value(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters(condition: &Value) -> StorageResult<Vec<&Filter>> {
    condition
        .as_array()
        .ok_or_else(|| StorageError::invalid_query("logical operator requires an array"))?
        .iter()
        .map(|v| {
            v.as_object()
                .ok_or_else(|| StorageError::invalid_query("logical operand must be an object"))
        })
        .collect()
}

fn logical_all(doc: &Document, condition: &Value) -> StorageResult<bool> {
    for filter in sub_filters(condition)? {
        if !matches_filter(doc, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical_any(doc: &Document, condition: &Value) -> StorageResult<bool> {
    for filter in sub_filters(condition)? {
        if matches_filter(doc, filter)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn matches_condition(value: Option<&Value>, condition: &Value) -> StorageResult<bool> {
    let ops = match condition.as_object() {
        Some(ops) if is_operator_object(condition) => ops,
        _ => return Ok(equals_lifted(value, condition)),
    };
    for (op, operand) in ops {
        if !evaluate_operator(value, op, operand)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality that also matches when an array field contains the literal, and
/// treats a missing field as equal to `null`.
fn equals_lifted(value: Option<&Value>, literal: &Value) -> bool {
    match value {
        None => literal.is_null(),
        Some(v) if v == literal => true,
        Some(Value::Array(items)) => items.iter().any(|item| item == literal),
        Some(_) => false,
    }
}

fn compare_lifted(value: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    let check = |v: &Value| {
        type_rank(v) == type_rank(operand) && accept(compare_values(v, operand))
    };
    match value {
        None => false,
        Some(Value::Array(items)) if !operand.is_array() => items.iter().any(check),
        Some(v) => check(v),
    }
}

fn evaluate_operator(value: Option<&Value>, op: &str, operand: &Value) -> StorageResult<bool> {
    match op {
        "$eq" => Ok(equals_lifted(value, operand)),
        "$ne" => Ok(!equals_lifted(value, operand)),
        "$gt" => Ok(compare_lifted(value, operand, |o| o == Ordering::Greater)),
        "$gte" => Ok(compare_lifted(value, operand, |o| o != Ordering::Less)),
        "$lt" => Ok(compare_lifted(value, operand, |o| o == Ordering::Less)),
        "$lte" => Ok(compare_lifted(value, operand, |o| o != Ordering::Greater)),
        "$in" => {
            let candidates = operand
                .as_array()
                .ok_or_else(|| StorageError::invalid_query("$in requires an array"))?;
            Ok(candidates.iter().any(|c| equals_lifted(value, c)))
        }
        "$nin" => {
            let candidates = operand
                .as_array()
                .ok_or_else(|| StorageError::invalid_query("$nin requires an array"))?;
            Ok(!candidates.iter().any(|c| equals_lifted(value, c)))
        }
        "$exists" => {
            let wanted = operand
                .as_bool()
                .ok_or_else(|| StorageError::invalid_query("$exists requires a boolean"))?;
            Ok(value.is_some() == wanted)
        }
        other => Err(StorageError::invalid_query(format!(
            "unsupported operator {other}"
        ))),
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Compares two documents under a sort specification.
pub fn compare_documents(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    for key in sort.keys() {
        let cmp = compare_for_sort(
            get_field_value(a, &key.field),
            get_field_value(b, &key.field),
        );
        if cmp != Ordering::Equal {
            return match key.direction {
                SortDirection::Ascending => cmp,
                SortDirection::Descending => cmp.reverse(),
            };
        }
    }
    Ordering::Equal
}

/// Sorts documents in place. Ties keep their original relative order.
pub fn sort_documents(docs: &mut [Document], sort: &SortSpec) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| compare_documents(a, b, sort));
}
