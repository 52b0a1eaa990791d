//! Storage collaborator trait definition.

use crate::document::{Document, Filter, SortSpec, UpdateSpec};
use crate::error::StorageResult;

/// The storage collaborator the LowlaDB core builds on.
///
/// A document store owns durable storage and raw filter/sort/limit execution
/// against stored documents. It knows nothing about cursors, live queries,
/// pending-change tracking or sync; those live above it. Namespaces are
/// passed as their `db.collection` string form.
///
/// # Invariants
///
/// - Storage order is stable: `find` with an empty sort returns documents in
///   the order they were inserted.
/// - `find_and_modify` touches at most one document, the first match in
///   storage order.
/// - A `Replace` update keeps the matched document's `_id`.
/// - Implementations must be `Send + Sync`; the core shares one store across
///   every collection and cursor of a handle.
///
/// # Implementors
///
/// - [`super::MemoryStore`] - reference engine for tests and ephemeral use
pub trait DocumentStore: Send + Sync {
    /// Stores `docs` in `namespace` and returns them as stored, in input order.
    ///
    /// Documents arrive with `_id` already assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if a document's `_id` already exists or the engine
    /// fails.
    fn insert(&self, namespace: &str, docs: Vec<Document>) -> StorageResult<Vec<Document>>;

    /// Returns documents matching `filter`, sorted by `sort`, truncated to
    /// `limit` (`0` means unbounded).
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated.
    fn find(
        &self,
        namespace: &str,
        filter: &Filter,
        sort: &SortSpec,
        limit: usize,
    ) -> StorageResult<Vec<Document>>;

    /// Counts documents matching `filter`, capped at `limit` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated.
    fn count(&self, namespace: &str, filter: &Filter, limit: Option<usize>) -> StorageResult<usize>;

    /// Deletes every document matching `filter` and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated.
    fn remove(&self, namespace: &str, filter: &Filter) -> StorageResult<usize>;

    /// Applies `update` to the first document matching `filter` and returns
    /// the updated document, or `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated or the update does
    /// not apply to the matched document. The stored document is unchanged
    /// on error.
    fn find_and_modify(
        &self,
        namespace: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StorageResult<Option<Document>>;

    /// Returns the bare names of the collections that exist in `database`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn collection_names(&self, database: &str) -> StorageResult<Vec<String>>;

    /// Removes every collection of `database`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn drop_database(&self, database: &str) -> StorageResult<()>;
}
