//! The top-level `LowlaDB` handle.

use crate::callback::complete;
use lowladb_core::{
    Collection, Config, Database, EventBus, ListenerId, Lowla, ValidationError,
};
use lowladb_storage::{DocumentStore, MemoryStore};
use lowladb_sync::{
    LoadOutcome, LoadSource, SyncConfig, SyncCycleResult, SyncEngine, SyncError, SyncResult,
    SyncTransport,
};
use serde_json::Value;
use std::sync::Arc;

/// A LowlaDB instance: a document database plus the engine that syncs it.
///
/// # Example
///
/// ```
/// use lowladb::{LowlaDB, MockTransport};
/// use serde_json::json;
///
/// let lowla = LowlaDB::in_memory(MockTransport::new());
/// let coll = lowla.collection("dbName", "collectionOne").unwrap();
/// coll.insert(json!({"a": 1}).as_object().cloned().unwrap_or_default()).unwrap();
///
/// assert_eq!(coll.count_all().unwrap(), 1);
/// lowla.close().unwrap();
/// ```
pub struct LowlaDB<T: SyncTransport> {
    lowla: Lowla,
    engine: SyncEngine<T>,
}

impl<T: SyncTransport> LowlaDB<T> {
    /// Creates a handle over `store`, syncing through `transport`.
    pub fn new(store: Arc<dyn DocumentStore>, transport: T) -> Self {
        Self::with_configs(Config::default(), SyncConfig::default(), store, transport)
    }

    /// Creates a handle with explicit configuration.
    pub fn with_configs(
        config: Config,
        sync_config: SyncConfig,
        store: Arc<dyn DocumentStore>,
        transport: T,
    ) -> Self {
        let lowla = Lowla::with_config(config, store);
        let engine = SyncEngine::with_config(lowla.clone(), transport, sync_config);
        Self { lowla, engine }
    }

    /// Creates a handle over a fresh in-memory store.
    pub fn in_memory(transport: T) -> Self {
        Self::new(Arc::new(MemoryStore::new()), transport)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Registers `listener` for the event `name`.
    pub fn on<F>(&self, name: &str, listener: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.events().on(name, listener)
    }

    /// Removes every listener for `name`.
    pub fn off(&self, name: &str) -> usize {
        self.events().off(name)
    }

    /// Removes one listener.
    pub fn off_listener(&self, name: &str, id: ListenerId) -> bool {
        self.events().off_listener(name, id)
    }

    /// Emits `name` to its listeners and returns how many ran.
    pub fn emit(&self, name: &str, args: &[Value]) -> usize {
        self.events().emit(name, args)
    }

    /// Returns the event bus.
    pub fn events(&self) -> &EventBus {
        self.lowla.events()
    }

    // =========================================================================
    // Databases and collections
    // =========================================================================

    /// Returns the database `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] for an empty or dotted
    /// name.
    pub fn db(&self, name: &str) -> Result<Database, ValidationError> {
        self.lowla.db(name)
    }

    /// Returns the collection `database.collection`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] if the namespace is
    /// invalid.
    pub fn collection(&self, database: &str, collection: &str) -> Result<Collection, ValidationError> {
        self.lowla.collection(database, collection)
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Loads one batch. See [`SyncEngine::load`].
    ///
    /// # Errors
    ///
    /// Returns the fetch, decode or apply failure.
    pub fn load(&self, source: impl Into<LoadSource>) -> SyncResult<LoadOutcome> {
        self.engine.load(source)
    }

    /// [`LowlaDB::load`] with a completion callback.
    ///
    /// # Errors
    ///
    /// Returns the same error the callback received.
    pub fn load_with<F>(&self, source: impl Into<LoadSource>, callback: F) -> SyncResult<LoadOutcome>
    where
        F: FnOnce(Result<&LoadOutcome, &SyncError>),
    {
        complete(self.load(source), callback)
    }

    /// Syncs against `url`. See [`SyncEngine::sync`].
    ///
    /// # Errors
    ///
    /// Returns the failing cycle's error after `syncEnd` has fired.
    pub fn sync(&self, url: &str) -> SyncResult<SyncCycleResult> {
        self.engine.sync(url)
    }

    /// [`LowlaDB::sync`] with a completion callback, invoked after
    /// `syncEnd`.
    ///
    /// # Errors
    ///
    /// Returns the same error the callback received.
    pub fn sync_with<F>(&self, url: &str, callback: F) -> SyncResult<SyncCycleResult>
    where
        F: FnOnce(Result<&SyncCycleResult, &SyncError>),
    {
        complete(self.sync(url), callback)
    }

    /// Returns the last fully applied batch sequence.
    pub fn sequence(&self) -> u64 {
        self.engine.sequence()
    }

    /// Returns the sync engine.
    pub fn engine(&self) -> &SyncEngine<T> {
        &self.engine
    }

    /// Returns the database handle.
    pub fn lowla(&self) -> &Lowla {
        &self.lowla
    }

    /// Closes the database and the transport.
    ///
    /// Live queries and listeners are dropped. Closing twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to close.
    pub fn close(&self) -> SyncResult<()> {
        tracing::debug!(sequence = self.sequence(), "closing handle");
        self.lowla.close();
        self.engine.transport().close()
    }
}

impl<T: SyncTransport> std::fmt::Debug for LowlaDB<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LowlaDB")
            .field("lowla", &self.lowla)
            .field("engine", &self.engine)
            .finish()
    }
}
