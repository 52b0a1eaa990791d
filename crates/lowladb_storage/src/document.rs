//! Document, filter, sort and update value types shared by every layer.

use crate::error::{StorageError, StorageResult};
use crate::query;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of the primary key field carried by every stored document.
pub const ID_FIELD: &str = "_id";

/// A schema-less document: an ordered mapping of field names to JSON values.
pub type Document = Map<String, Value>;

/// A query filter: field paths mapped to literals or operator objects.
///
/// An empty filter matches every document in the namespace.
pub type Filter = Map<String, Value>;

/// Returns the `_id` of a document if it is a string.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Builds a filter matching a single document by `_id`.
pub fn id_filter(id: &str) -> Filter {
    let mut filter = Filter::new();
    filter.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    filter
}

/// Direction of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest values first.
    #[default]
    Ascending,
    /// Largest values first.
    Descending,
}

impl SortDirection {
    /// Parses a direction from its wire form (`1`, `-1`, `"asc"`, `"desc"`).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Self::Ascending),
                Some(-1) => Some(Self::Descending),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "asc" | "ascending" => Some(Self::Ascending),
                "desc" | "descending" => Some(Self::Descending),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the numeric wire form.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// A single `(field, direction)` sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Dot path of the field to compare.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates an ascending sort key.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending sort key.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// An ordered list of sort keys. Empty means storage order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    /// Creates an empty sort specification (storage order).
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Appends a key, returning the extended specification.
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.0.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Returns the keys in priority order.
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// Returns true if no sort key is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses the wire forms accepted by `sort()`:
    ///
    /// - `"field"`
    /// - `["field", -1]`
    /// - `[["a", 1], "b", ["c", -1]]`
    /// - `{"a": 1, "b": -1}`
    /// - `null` (no sort)
    pub fn from_value(value: &Value) -> StorageResult<Self> {
        match value {
            Value::Null => Ok(Self::none()),
            Value::String(field) => Ok(Self(vec![SortKey::ascending(field.clone())])),
            Value::Array(items) => {
                if let Some(key) = Self::parse_pair(items) {
                    return Ok(Self(vec![key]));
                }
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(field) => Ok(SortKey::ascending(field.clone())),
                        Value::Array(pair) => Self::parse_pair(pair).ok_or_else(|| {
                            StorageError::invalid_query(format!("invalid sort pair: {item}"))
                        }),
                        other => Err(StorageError::invalid_query(format!(
                            "invalid sort key: {other}"
                        ))),
                    })
                    .collect::<StorageResult<Vec<_>>>()
                    .map(Self)
            }
            Value::Object(map) => map
                .iter()
                .map(|(field, dir)| {
                    SortDirection::from_value(dir)
                        .map(|direction| SortKey {
                            field: field.clone(),
                            direction,
                        })
                        .ok_or_else(|| {
                            StorageError::invalid_query(format!(
                                "invalid sort direction for {field}: {dir}"
                            ))
                        })
                })
                .collect::<StorageResult<Vec<_>>>()
                .map(Self),
            other => Err(StorageError::invalid_query(format!(
                "invalid sort specification: {other}"
            ))),
        }
    }

    fn parse_pair(items: &[Value]) -> Option<SortKey> {
        match items {
            [Value::String(field), dir] => {
                SortDirection::from_value(dir).map(|direction| SortKey {
                    field: field.clone(),
                    direction,
                })
            }
            [Value::String(field)] => Some(SortKey::ascending(field.clone())),
            _ => None,
        }
    }
}

impl From<&str> for SortSpec {
    fn from(field: &str) -> Self {
        Self(vec![SortKey::ascending(field)])
    }
}

impl From<String> for SortSpec {
    fn from(field: String) -> Self {
        Self(vec![SortKey::ascending(field)])
    }
}

impl From<(&str, SortDirection)> for SortSpec {
    fn from((field, direction): (&str, SortDirection)) -> Self {
        Self(vec![SortKey {
            field: field.to_string(),
            direction,
        }])
    }
}

impl From<SortKey> for SortSpec {
    fn from(key: SortKey) -> Self {
        Self(vec![key])
    }
}

impl From<Vec<SortKey>> for SortSpec {
    fn from(keys: Vec<SortKey>) -> Self {
        Self(keys)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|k| format!("{}:{}", k.field, k.direction.as_i64()))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// A single field-level update operator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// `$set`: assign a value at a dot path, creating parents as needed.
    Set {
        /// Dot path of the field.
        path: String,
        /// New value.
        value: Value,
    },
    /// `$unset`: remove the field at a dot path. Absent paths are a no-op.
    Unset {
        /// Dot path of the field.
        path: String,
    },
    /// `$inc`: add a number to the field at a dot path (absent means set).
    Inc {
        /// Dot path of the field.
        path: String,
        /// Amount to add.
        by: serde_json::Number,
    },
}

/// A validated modification applied by `find_and_modify`.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    /// Operator document applied field by field; `_id` is untouched.
    Operators(Vec<UpdateOp>),
    /// Full replacement; the matched document keeps its existing `_id`.
    Replace(Document),
}

impl UpdateSpec {
    /// Applies the update to `doc` in place.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidUpdate`] when `$inc` targets a
    /// non-numeric value or a path runs through a non-object.
    pub fn apply(&self, doc: &mut Document) -> StorageResult<()> {
        match self {
            Self::Operators(ops) => {
                for op in ops {
                    match op {
                        UpdateOp::Set { path, value } => {
                            query::set_field_value(doc, path, value.clone())?;
                        }
                        UpdateOp::Unset { path } => {
                            query::unset_field_value(doc, path);
                        }
                        UpdateOp::Inc { path, by } => {
                            let current = query::get_field_value(doc, path);
                            let next = match current {
                                None => Value::Number(by.clone()),
                                Some(Value::Number(n)) => add_numbers(n, by),
                                Some(other) => {
                                    return Err(StorageError::invalid_update(format!(
                                        "cannot apply $inc to non-numeric field {path}: {other}"
                                    )))
                                }
                            };
                            query::set_field_value(doc, path, next)?;
                        }
                    }
                }
                Ok(())
            }
            Self::Replace(replacement) => {
                let id = doc.get(ID_FIELD).cloned();
                let mut next = Document::new();
                if let Some(id) = id {
                    next.insert(ID_FIELD.to_string(), id);
                }
                for (key, value) in replacement {
                    if key != ID_FIELD {
                        next.insert(key.clone(), value.clone());
                    }
                }
                *doc = next;
                Ok(())
            }
        }
    }
}

fn add_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Value::from(sum);
        }
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    serde_json::Number::from_f64(sum)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
