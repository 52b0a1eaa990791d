//! Deferred, composable queries over one namespace.
//!
//! A [`Cursor`] is a query descriptor: namespace, filter and an effective
//! [`CursorOptions`]. Deriving a cursor (`sort`, `limit`, `show_pending`)
//! returns a new value and never touches the receiver. Nothing is read from
//! storage until `to_array`, `each` or `count` is called.
//!
//! A cursor holds only its namespace, its query and the collaborators it
//! evaluates against. It cannot reach the handle that created it.

use crate::error::{CoreError, CoreResult};
use crate::live::{LiveQuery, LiveQueryRegistry};
use crate::pending::PendingChanges;
use crate::types::Namespace;
use lowladb_storage::{document_id, Document, DocumentStore, Filter, SortSpec};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Field added to each document returned by a `show_pending` cursor.
pub const PENDING_FIELD: &str = "$pending";

/// The effective options of a cursor.
///
/// Defaults are `{sort: none, limit: 0, show_pending: false}`. A limit of
/// `0` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CursorOptions {
    /// Sort keys in priority order.
    pub sort: SortSpec,
    /// Maximum number of documents returned, `0` for all.
    pub limit: usize,
    /// Whether returned documents carry the `$pending` marker.
    pub show_pending: bool,
}

/// Caller-supplied options; unset fields fall through to the layer below.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CursorOverrides {
    /// Overrides the sort.
    pub sort: Option<SortSpec>,
    /// Overrides the limit.
    pub limit: Option<usize>,
    /// Overrides the pending marker flag.
    pub show_pending: Option<bool>,
}

impl CursorOverrides {
    /// Sets the sort override.
    #[must_use]
    pub fn sort(mut self, sort: impl Into<SortSpec>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Sets the limit override.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the pending marker override.
    #[must_use]
    pub fn show_pending(mut self, show: bool) -> Self {
        self.show_pending = Some(show);
        self
    }
}

impl CursorOptions {
    /// Layers `overrides` onto the defaults.
    #[must_use]
    pub fn layered(overrides: CursorOverrides) -> Self {
        Self::default().with(overrides)
    }

    /// Layers `overrides` onto these options, returning the result.
    #[must_use]
    pub fn with(mut self, overrides: CursorOverrides) -> Self {
        if let Some(sort) = overrides.sort {
            self.sort = sort;
        }
        if let Some(limit) = overrides.limit {
            self.limit = limit;
        }
        if let Some(show) = overrides.show_pending {
            self.show_pending = show;
        }
        self
    }
}

/// What a cursor needs to evaluate and subscribe.
#[derive(Clone)]
pub(crate) struct QueryContext {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) live: Arc<LiveQueryRegistry>,
    pub(crate) pending: Arc<PendingChanges>,
    pub(crate) closed: Arc<AtomicBool>,
}

impl QueryContext {
    pub(crate) fn check_open(&self) -> CoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CoreError::Closed)
        } else {
            Ok(())
        }
    }
}

/// A query over one namespace.
#[derive(Clone)]
pub struct Cursor {
    namespace: Namespace,
    filter: Filter,
    options: CursorOptions,
    ctx: QueryContext,
}

impl Cursor {
    pub(crate) fn new(
        namespace: Namespace,
        filter: Filter,
        options: CursorOptions,
        ctx: QueryContext,
    ) -> Self {
        Self {
            namespace,
            filter,
            options,
            ctx,
        }
    }

    /// Returns the namespace this cursor reads.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the filter.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Returns the effective options.
    #[must_use]
    pub fn options(&self) -> &CursorOptions {
        &self.options
    }

    /// Returns a cursor with `overrides` layered onto this cursor's options.
    #[must_use]
    pub fn with_options(&self, overrides: CursorOverrides) -> Self {
        Self {
            options: self.options.clone().with(overrides),
            ..self.clone()
        }
    }

    /// Returns a cursor sorted by `sort`.
    ///
    /// Accepts anything convertible to a [`SortSpec`]: a field name, a
    /// `(field, direction)` pair or a prepared list of keys.
    #[must_use]
    pub fn sort(&self, sort: impl Into<SortSpec>) -> Self {
        self.with_options(CursorOverrides::default().sort(sort))
    }

    /// Returns a cursor limited to `limit` documents (`0` for all).
    #[must_use]
    pub fn limit(&self, limit: usize) -> Self {
        self.with_options(CursorOverrides::default().limit(limit))
    }

    /// Returns a cursor whose documents carry the `$pending` marker.
    #[must_use]
    pub fn show_pending(&self) -> Self {
        self.with_options(CursorOverrides::default().show_pending(true))
    }

    /// Evaluates the cursor: filter, then sort, then limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn to_array(&self) -> CoreResult<Vec<Document>> {
        self.ctx.check_open()?;
        let mut docs = self.ctx.store.find(
            &self.namespace.to_string(),
            &self.filter,
            &self.options.sort,
            self.options.limit,
        )?;

        if self.options.show_pending {
            for doc in &mut docs {
                let pending = document_id(doc)
                    .is_some_and(|id| self.ctx.pending.is_pending(&self.namespace, id));
                doc.insert(PENDING_FIELD.to_string(), Value::Bool(pending));
            }
        }
        Ok(docs)
    }

    /// Delivers the documents of `to_array` one at a time, followed by a
    /// final `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails; `callback` is not invoked then.
    pub fn each<F>(&self, mut callback: F) -> CoreResult<()>
    where
        F: FnMut(Option<Document>),
    {
        for doc in self.to_array()? {
            callback(Some(doc));
        }
        callback(None);
        Ok(())
    }

    /// Counts matching documents.
    ///
    /// The limit is ignored unless `apply_limit` is true.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn count(&self, apply_limit: bool) -> CoreResult<usize> {
        self.ctx.check_open()?;
        let limit = apply_limit.then_some(self.options.limit);
        Ok(self
            .ctx
            .store
            .count(&self.namespace.to_string(), &self.filter, limit)?)
    }

    /// Subscribes this cursor for live updates.
    ///
    /// `callback` runs once immediately and then once after every mutating
    /// operation on the namespace, until the returned [`LiveQuery`] is
    /// unsubscribed. The callback re-evaluates the cursor it is given.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] if the handle is closed.
    pub fn on<F>(&self, callback: F) -> CoreResult<LiveQuery>
    where
        F: Fn(&Cursor) + Send + Sync + 'static,
    {
        self.ctx.check_open()?;
        Ok(self.ctx.live.subscribe(self.clone(), Arc::new(callback)))
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("namespace", &self.namespace.to_string())
            .field("filter", &self.filter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowladb_storage::{MemoryStore, SortDirection};
    use serde_json::json;

    fn context(store: Arc<MemoryStore>) -> QueryContext {
        QueryContext {
            store,
            live: Arc::new(LiveQueryRegistry::new()),
            pending: Arc::new(PendingChanges::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn seeded() -> (Arc<MemoryStore>, Cursor) {
        let store = Arc::new(MemoryStore::new());
        let docs = [json!({"_id": "b", "a": 2}), json!({"_id": "c", "a": 3}), json!({"_id": "a", "a": 1})]
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        store.insert("db.coll", docs).unwrap();
        let ns = Namespace::parse("db.coll").unwrap();
        let cursor = Cursor::new(ns, Filter::new(), CursorOptions::default(), context(Arc::clone(&store)));
        (store, cursor)
    }

    fn values(docs: &[Document]) -> Vec<i64> {
        docs.iter().map(|d| d["a"].as_i64().unwrap()).collect()
    }

    #[test]
    fn layered_options_fall_through() {
        let opts = CursorOptions::layered(CursorOverrides::default().limit(5));
        assert_eq!(opts.limit, 5);
        assert!(opts.sort.is_empty());
        assert!(!opts.show_pending);
    }

    #[test]
    fn derivations_do_not_mutate_receiver() {
        let (_, cursor) = seeded();
        let sorted = cursor.sort("a");
        let limited = sorted.limit(1);
        assert!(cursor.options().sort.is_empty());
        assert_eq!(sorted.options().limit, 0);
        assert_eq!(limited.options().limit, 1);
        assert!(!limited.sort("a").options().show_pending);
    }

    #[test]
    fn to_array_sorts_then_limits() {
        let (_, cursor) = seeded();
        assert_eq!(values(&cursor.to_array().unwrap()), vec![2, 3, 1]);
        assert_eq!(values(&cursor.sort("a").to_array().unwrap()), vec![1, 2, 3]);
        assert_eq!(
            values(&cursor.limit(1).sort(("a", SortDirection::Descending)).to_array().unwrap()),
            vec![3]
        );
    }

    #[test]
    fn each_terminates_with_none() {
        let (_, cursor) = seeded();
        let mut seen = Vec::new();
        cursor.sort("a").each(|doc| seen.push(doc)).unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen[3].is_none());
        assert_eq!(seen[0].as_ref().unwrap()["a"], json!(1));
    }

    #[test]
    fn count_ignores_limit_unless_asked() {
        let (_, cursor) = seeded();
        let limited = cursor.limit(2);
        assert_eq!(limited.count(false).unwrap(), 3);
        assert_eq!(limited.count(true).unwrap(), 2);
    }

    #[test]
    fn show_pending_marks_documents() {
        let (_, cursor) = seeded();
        cursor.ctx.pending.mark(cursor.namespace(), "a");
        let docs = cursor.sort("a").show_pending().to_array().unwrap();
        assert_eq!(docs[0][PENDING_FIELD], json!(true));
        assert_eq!(docs[1][PENDING_FIELD], json!(false));
        assert!(cursor.to_array().unwrap()[0].get(PENDING_FIELD).is_none());
    }

    #[test]
    fn closed_context_rejects_evaluation() {
        let (_, cursor) = seeded();
        cursor.ctx.closed.store(true, Ordering::SeqCst);
        assert!(matches!(cursor.to_array(), Err(CoreError::Closed)));
        assert!(matches!(cursor.count(false), Err(CoreError::Closed)));
    }
}
