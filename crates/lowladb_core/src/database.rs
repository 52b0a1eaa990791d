//! Top-level and database-level handles.
//!
//! A [`Lowla`] handle owns everything shared by its collections: the storage
//! collaborator, the event bus, the live query registry, pending-change
//! tracking and the sync position. A [`Database`] is only a naming scope
//! over it.
//!
//! # Example
//!
//! ```rust
//! use lowladb_core::Lowla;
//! use serde_json::json;
//!
//! let lowla = Lowla::in_memory();
//! let coll = lowla.collection("dbName", "Coll").unwrap();
//! coll.insert(json!({"a": 1}).as_object().cloned().unwrap()).unwrap();
//! assert_eq!(coll.count_all().unwrap(), 1);
//! ```

use crate::collection::Collection;
use crate::config::Config;
use crate::cursor::QueryContext;
use crate::error::{CoreResult, ValidationError};
use crate::events::EventBus;
use crate::live::LiveQueryRegistry;
use crate::pending::PendingChanges;
use crate::state::SyncState;
use crate::types::Namespace;
use lowladb_storage::{DocumentStore, MemoryStore};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared by a handle and every collection obtained from it.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) events: EventBus,
    pub(crate) sync_state: SyncState,
    pub(crate) query: QueryContext,
}

impl Drop for Shared {
    fn drop(&mut self) {
        // Subscriptions hold cursors that point back at the registry.
        self.query.live.clear();
    }
}

/// The top-level LowlaDB handle.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct Lowla {
    shared: Arc<Shared>,
}

impl Lowla {
    /// Creates a handle over `store` with the default configuration.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(Config::default(), store)
    }

    /// Creates a handle over `store` with `config`.
    pub fn with_config(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let query = QueryContext {
            store,
            live: Arc::new(LiveQueryRegistry::new()),
            pending: Arc::new(PendingChanges::new()),
            closed: Arc::new(AtomicBool::new(false)),
        };
        Self {
            shared: Arc::new(Shared {
                config,
                events: EventBus::new(),
                sync_state: SyncState::new(),
                query,
            }),
        }
    }

    /// Creates a handle over a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Returns the database-level handle for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] if `name` is empty or
    /// contains a dot.
    pub fn db(&self, name: &str) -> Result<Database, ValidationError> {
        if name.is_empty() || name.contains('.') {
            return Err(ValidationError::InvalidNamespace {
                namespace: name.to_string(),
            });
        }
        Ok(Database {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }

    /// Returns the collection `database.collection`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] for an invalid name.
    pub fn collection(&self, database: &str, collection: &str) -> Result<Collection, ValidationError> {
        let namespace = Namespace::new(database, collection)?;
        Ok(self.collection_for(namespace))
    }

    /// Returns the collection for an already parsed namespace.
    #[must_use]
    pub fn collection_for(&self, namespace: Namespace) -> Collection {
        Collection::new(namespace, Arc::clone(&self.shared))
    }

    /// Returns the handle's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Returns the live query registry.
    #[must_use]
    pub fn live(&self) -> &Arc<LiveQueryRegistry> {
        &self.shared.query.live
    }

    /// Returns the storage collaborator.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.shared.query.store
    }

    /// Returns the sync position.
    #[must_use]
    pub fn sync_state(&self) -> &SyncState {
        &self.shared.sync_state
    }

    /// Returns pending-change tracking.
    #[must_use]
    pub fn pending(&self) -> &PendingChanges {
        &self.shared.query.pending
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Closes the handle.
    ///
    /// Drops every live subscription and event listener. Later operations
    /// through any collection or cursor of this handle fail with
    /// [`crate::CoreError::Closed`]. Closing twice is a no-op.
    pub fn close(&self) {
        if self.shared.query.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.query.live.clear();
        self.shared.events.clear();
        tracing::debug!("handle closed");
    }

    /// Returns true once `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.query.closed.load(Ordering::SeqCst)
    }
}

impl Default for Lowla {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for Lowla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lowla")
            .field("sequence", &self.shared.sync_state.sequence())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// An entry returned by [`Database::collection_names`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    /// Qualified `db.collection` name.
    pub name: String,
}

/// A database: a naming scope for collections.
#[derive(Clone)]
pub struct Database {
    name: String,
    shared: Arc<Shared>,
}

impl Database {
    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the collection `name` in this database.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] if `name` is empty.
    pub fn collection(&self, name: &str) -> Result<Collection, ValidationError> {
        let namespace = Namespace::new(self.name.as_str(), name)?;
        Ok(Collection::new(namespace, Arc::clone(&self.shared)))
    }

    /// Lists the collections of this database.
    ///
    /// With a `prefix`, only collections whose bare name starts with it are
    /// listed. Names are returned qualified as `db.collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn collection_names(&self, prefix: Option<&str>) -> CoreResult<Vec<CollectionInfo>> {
        Ok(self
            .collection_names_only(prefix)?
            .into_iter()
            .map(|name| CollectionInfo { name })
            .collect())
    }

    /// Like [`Database::collection_names`], returning plain strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn collection_names_only(&self, prefix: Option<&str>) -> CoreResult<Vec<String>> {
        self.shared.query.check_open()?;
        let names = self.shared.query.store.collection_names(&self.name)?;
        Ok(names
            .into_iter()
            .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
            .map(|name| format!("{}.{}", self.name, name))
            .collect())
    }

    /// Removes every collection in this database.
    ///
    /// Live queries on every namespace that existed are notified, and
    /// pending marks in the database are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or storage fails.
    pub fn drop_database(&self) -> CoreResult<()> {
        self.shared.query.check_open()?;
        let store = &self.shared.query.store;
        let existing = store.collection_names(&self.name)?;
        store.drop_database(&self.name)?;
        self.shared.query.pending.clear_database(&self.name);
        tracing::debug!(database = %self.name, collections = existing.len(), "dropped database");

        let live = &self.shared.query.live;
        for namespace in live.namespaces() {
            if namespace.database() == self.name {
                live.notify(&namespace);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
