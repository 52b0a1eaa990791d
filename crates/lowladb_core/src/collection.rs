//! Namespace-scoped document operations.

use crate::cursor::{Cursor, CursorOptions, CursorOverrides};
use crate::database::Shared;
use crate::error::{CoreResult, ValidationError};
use crate::types::Namespace;
use crate::update::{parse_update, validate_document};
use lowladb_storage::{document_id, id_filter, Document, Filter, UpdateSpec, ID_FIELD};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A collection within a database.
///
/// Mutating operations validate their input before touching storage and
/// notify live queries on the namespace once per successful call.
#[derive(Clone)]
pub struct Collection {
    namespace: Namespace,
    shared: Arc<Shared>,
}

impl Collection {
    pub(crate) fn new(namespace: Namespace, shared: Arc<Shared>) -> Self {
        Self { namespace, shared }
    }

    /// Returns the namespace of this collection.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the bare collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.namespace.collection()
    }

    /// Returns the database name.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.namespace.database()
    }

    fn ns(&self) -> String {
        self.namespace.to_string()
    }

    fn notify(&self) {
        self.shared.query.live.notify(&self.namespace);
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts one document and returns it with its `_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a top-level field starts with `$` or
    /// `_id` is not a string, or a storage error.
    pub fn insert(&self, doc: Document) -> CoreResult<Document> {
        let mut stored = self.insert_many(vec![doc])?;
        Ok(stored.pop().unwrap_or_default())
    }

    /// Inserts documents in order and returns them with their `_id`s.
    ///
    /// Every document is validated before any is stored, and live queries
    /// are notified once for the whole call.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first offending field, or a
    /// storage error. Nothing is stored in either case.
    pub fn insert_many(&self, docs: Vec<Document>) -> CoreResult<Vec<Document>> {
        self.shared.query.check_open()?;
        for doc in &docs {
            validate_document(doc)?;
        }
        if docs.is_empty() {
            return Ok(docs);
        }

        let docs: Vec<Document> = docs
            .into_iter()
            .map(|mut doc| {
                if !doc.contains_key(ID_FIELD) {
                    let id = self.shared.config.generate_id(&self.namespace, &doc);
                    doc.insert(ID_FIELD.to_string(), Value::String(id));
                }
                doc
            })
            .collect();

        let stored = self.shared.query.store.insert(&self.ns(), docs)?;
        for doc in &stored {
            if let Some(id) = document_id(doc) {
                self.shared.query.pending.mark(&self.namespace, id);
            }
        }
        tracing::debug!(namespace = %self.namespace, count = stored.len(), "inserted documents");
        self.notify();
        Ok(stored)
    }

    /// Deletes every document matching `filter`. Returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn remove(&self, filter: Filter) -> CoreResult<usize> {
        self.shared.query.check_open()?;
        let removed = self.shared.query.store.remove(&self.ns(), &filter)?;
        tracing::debug!(namespace = %self.namespace, removed, "removed documents");
        self.notify();
        Ok(removed)
    }

    /// Deletes every document in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn remove_all(&self) -> CoreResult<usize> {
        self.remove(Filter::new())
    }

    /// Applies `update` to the first document matching `filter` in storage
    /// order and returns the updated document, or `None` if nothing matches.
    ///
    /// `update` is either an operator document (`$set`, `$unset`, `$inc`) or
    /// a full replacement that keeps the matched document's `_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed update, checked before
    /// storage is touched, or a storage error.
    pub fn find_and_modify(&self, filter: Filter, update: &Document) -> CoreResult<Option<Document>> {
        self.shared.query.check_open()?;
        let spec = parse_update(update)?;
        let updated = self
            .shared
            .query
            .store
            .find_and_modify(&self.ns(), &filter, &spec)?;

        if let Some(doc) = &updated {
            if let Some(id) = document_id(doc) {
                self.shared.query.pending.mark(&self.namespace, id);
            }
            self.notify();
        }
        Ok(updated)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns a cursor over documents matching `filter`.
    #[must_use]
    pub fn find(&self, filter: Filter) -> Cursor {
        self.find_with_options(filter, CursorOverrides::default())
    }

    /// Returns a cursor over every document.
    #[must_use]
    pub fn find_all(&self) -> Cursor {
        self.find(Filter::new())
    }

    /// Returns a cursor with caller options layered onto the defaults.
    #[must_use]
    pub fn find_with_options(&self, filter: Filter, overrides: CursorOverrides) -> Cursor {
        Cursor::new(
            self.namespace.clone(),
            filter,
            CursorOptions::layered(overrides),
            self.shared.query.clone(),
        )
    }

    /// Returns the first document matching `filter`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn find_one(&self, filter: Filter) -> CoreResult<Option<Document>> {
        Ok(self.find(filter).limit(1).to_array()?.into_iter().next())
    }

    /// Counts documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn count(&self, filter: Filter) -> CoreResult<usize> {
        self.find(filter).count(false)
    }

    /// Counts every document in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn count_all(&self) -> CoreResult<usize> {
        self.count(Filter::new())
    }

    // =========================================================================
    // Sync path
    // =========================================================================

    /// Inserts or replaces a document delivered by sync, keyed by its `_id`.
    ///
    /// The document is taken as already validated by its origin, so `$`
    /// field names are accepted. Live queries are not notified; the caller
    /// notifies once per applied page.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidId`] if the document has no string
    /// `_id`, or a storage error.
    pub fn upsert_remote(&self, doc: Document) -> CoreResult<Document> {
        self.shared.query.check_open()?;
        let id = document_id(&doc)
            .ok_or_else(|| ValidationError::InvalidId {
                message: "synced document has no string _id".to_string(),
            })?
            .to_string();

        let ns = self.ns();
        let store = &self.shared.query.store;
        let stored = match store.find_and_modify(&ns, &id_filter(&id), &UpdateSpec::Replace(doc.clone()))? {
            Some(updated) => updated,
            None => store.insert(&ns, vec![doc])?.pop().unwrap_or_default(),
        };
        self.shared.query.pending.clear(&self.namespace, &id);
        Ok(stored)
    }

    /// Deletes a document by `_id` on behalf of sync. Deleting an absent
    /// document is not an error. Live queries are not notified.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn delete_remote(&self, id: &str) -> CoreResult<usize> {
        self.shared.query.check_open()?;
        let removed = self.shared.query.store.remove(&self.ns(), &id_filter(id))?;
        self.shared.query.pending.clear(&self.namespace, id);
        Ok(removed)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.ns())
            .finish_non_exhaustive()
    }
}
