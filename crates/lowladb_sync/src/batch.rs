//! Sync batch wire format and decoding.
//!
//! A batch is `{ "sequence": N, "documents": [page, ...] }`. Each page is a
//! flat array alternating entry metadata and, for live documents, the full
//! document that follows it:
//!
//! ```json
//! [
//!   { "id": "db.coll$1234", "clientNs": "db.coll", "deleted": false },
//!   { "_id": "1234", "a": 1 },
//!   { "id": "db.coll$5678", "clientNs": "db.coll", "deleted": true }
//! ]
//! ```

use crate::error::{SyncError, SyncResult};
use lowladb_core::{Document, Namespace};
use lowladb_storage::ID_FIELD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separates the client namespace from the document key in a sync id.
pub const ID_SEPARATOR: char = '$';

/// One sync payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncBatch {
    /// Position of this batch in the remote change stream.
    pub sequence: u64,
    /// Pages of alternating entries and documents.
    #[serde(default)]
    pub documents: Vec<Vec<Value>>,
}

impl SyncBatch {
    /// Creates a batch from its pages.
    pub fn new(sequence: u64, documents: Vec<Vec<Value>>) -> Self {
        Self {
            sequence,
            documents,
        }
    }

    /// Parses a batch from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Protocol`] if the text is not a batch.
    pub fn from_json(text: &str) -> SyncResult<Self> {
        serde_json::from_str(text).map_err(|e| SyncError::protocol(format!("invalid batch: {e}")))
    }

    /// Serializes the batch as JSON text.
    pub fn to_json(&self) -> String {
        Value::from(self).to_string()
    }

    /// Returns the number of pages.
    pub fn page_count(&self) -> usize {
        self.documents.len()
    }

    /// Decodes every page.
    ///
    /// Decoding is all-or-nothing: a malformed entry anywhere in the batch
    /// fails the whole batch before anything is applied.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Protocol`] on a malformed page.
    pub fn decode(&self) -> SyncResult<Vec<DecodedPage>> {
        self.documents
            .iter()
            .enumerate()
            .map(|(index, page)| DecodedPage::decode(index, page))
            .collect()
    }
}

impl From<&SyncBatch> for Value {
    fn from(batch: &SyncBatch) -> Self {
        serde_json::json!({
            "sequence": batch.sequence,
            "documents": batch.documents,
        })
    }
}

/// Metadata preceding each change in a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatchEntry {
    /// Sync id, either `<clientNs>$<key>` or a bare key.
    pub id: String,
    /// Target namespace.
    #[serde(rename = "clientNs")]
    pub client_ns: String,
    /// True when the document was removed remotely.
    #[serde(default)]
    pub deleted: bool,
}

/// A single decoded change.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedChange {
    /// Insert or replace a document.
    Upsert {
        /// Target namespace.
        namespace: Namespace,
        /// Normalized sync id.
        id: String,
        /// The document, carrying its `_id`.
        document: Document,
    },
    /// Remove a document.
    Delete {
        /// Target namespace.
        namespace: Namespace,
        /// Normalized sync id.
        id: String,
    },
}

impl DecodedChange {
    /// Returns the target namespace.
    pub fn namespace(&self) -> &Namespace {
        match self {
            Self::Upsert { namespace, .. } | Self::Delete { namespace, .. } => namespace,
        }
    }

    /// Returns the normalized sync id.
    pub fn id(&self) -> &str {
        match self {
            Self::Upsert { id, .. } | Self::Delete { id, .. } => id,
        }
    }

    /// Returns the document key the change targets.
    pub fn key(&self) -> &str {
        match self {
            Self::Upsert {
                namespace,
                id,
                document,
            } => document
                .get(ID_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_else(|| document_key(id, &namespace.to_string())),
            Self::Delete { namespace, id } => document_key(id, &namespace.to_string()),
        }
    }

    /// Returns true for deletions.
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }
}

/// One decoded page, in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    /// Changes in the order they appeared.
    pub changes: Vec<DecodedChange>,
}

impl DecodedPage {
    fn decode(index: usize, page: &[Value]) -> SyncResult<Self> {
        let mut changes = Vec::new();
        let mut values = page.iter().enumerate();

        while let Some((pos, raw)) = values.next() {
            let entry: SyncBatchEntry = serde_json::from_value(raw.clone()).map_err(|e| {
                SyncError::protocol(format!("page {index}, element {pos}: bad entry: {e}"))
            })?;
            let namespace = Namespace::parse(&entry.client_ns).map_err(|e| {
                SyncError::protocol(format!("page {index}, element {pos}: {e}"))
            })?;
            let id = normalize_id(&entry.id, &entry.client_ns);

            if entry.deleted {
                changes.push(DecodedChange::Delete { namespace, id });
                continue;
            }

            let mut document = match values.next() {
                Some((_, Value::Object(doc))) => doc.clone(),
                Some((pos, _)) => {
                    return Err(SyncError::protocol(format!(
                        "page {index}, element {pos}: document for {id} is not an object"
                    )))
                }
                None => {
                    return Err(SyncError::protocol(format!(
                        "page {index}: entry {id} has no document"
                    )))
                }
            };
            match document.get(ID_FIELD) {
                None => {
                    let key = document_key(&id, &entry.client_ns).to_string();
                    document.insert(ID_FIELD.to_string(), Value::String(key));
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(SyncError::protocol(format!(
                        "page {index}: document for {id} has a non-string _id"
                    )))
                }
            }
            changes.push(DecodedChange::Upsert {
                namespace,
                id,
                document,
            });
        }

        Ok(Self { changes })
    }

    /// Returns the distinct namespaces touched, in first-touch order.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut seen: Vec<Namespace> = Vec::new();
        for change in &self.changes {
            if !seen.contains(change.namespace()) {
                seen.push(change.namespace().clone());
            }
        }
        seen
    }

    /// Returns true if the page has no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Qualifies a bare id with its namespace.
///
/// Ids that already contain [`ID_SEPARATOR`] are returned unchanged.
pub fn normalize_id(id: &str, client_ns: &str) -> String {
    if id.contains(ID_SEPARATOR) {
        id.to_string()
    } else {
        format!("{client_ns}{ID_SEPARATOR}{id}")
    }
}

/// Returns the document key of a normalized id.
///
/// The `<client_ns>$` prefix is stripped when present. An id qualified with
/// some other namespace yields everything after its first separator.
pub fn document_key<'a>(normalized: &'a str, client_ns: &str) -> &'a str {
    normalized
        .strip_prefix(client_ns)
        .and_then(|rest| rest.strip_prefix(ID_SEPARATOR))
        .or_else(|| normalized.split_once(ID_SEPARATOR).map(|(_, key)| key))
        .unwrap_or(normalized)
}

/// Builds pages in the wire layout.
///
/// Document ids are taken from each document's `_id` and qualified with the
/// builder's namespace.
#[derive(Debug, Clone)]
pub struct PageBuilder {
    client_ns: String,
    values: Vec<Value>,
}

impl PageBuilder {
    /// Starts a page targeting `client_ns`.
    pub fn new(client_ns: impl Into<String>) -> Self {
        Self {
            client_ns: client_ns.into(),
            values: Vec::new(),
        }
    }

    fn entry(&self, id: &str, deleted: bool) -> Value {
        serde_json::json!({
            "id": normalize_id(id, &self.client_ns),
            "clientNs": self.client_ns,
            "deleted": deleted,
        })
    }

    /// Appends an upsert for `doc`. A document without a string `_id`
    /// is keyed by its position in the page.
    #[must_use]
    pub fn upsert(mut self, doc: Document) -> Self {
        let id = doc
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map_or_else(|| self.values.len().to_string(), str::to_string);
        let entry = self.entry(&id, false);
        self.values.push(entry);
        self.values.push(Value::Object(doc));
        self
    }

    /// Appends an upsert for each document.
    #[must_use]
    pub fn upsert_all(self, docs: impl IntoIterator<Item = Document>) -> Self {
        docs.into_iter().fold(self, Self::upsert)
    }

    /// Appends a deletion of `id`.
    #[must_use]
    pub fn delete(mut self, id: &str) -> Self {
        let entry = self.entry(id, true);
        self.values.push(entry);
        self
    }

    /// Returns the page values.
    pub fn build(self) -> Vec<Value> {
        self.values
    }
}
