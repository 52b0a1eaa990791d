//! # LowlaDB
//!
//! An offline-first document database with live queries and incremental
//! sync.
//!
//! This crate ties the pieces together:
//! - [`LowlaDB`], the handle combining the database and its sync engine
//! - Callback-style variants of every operation ([`CollectionCallbacks`],
//!   [`CursorCallbacks`], [`DatabaseCallbacks`])
//! - Re-exports of the core, storage and sync types
//!
//! ## Example
//!
//! ```
//! use lowladb::{LowlaDB, MockTransport, PageBuilder, SyncBatch};
//! use serde_json::json;
//!
//! let lowla = LowlaDB::in_memory(MockTransport::new());
//! let page = PageBuilder::new("dbName.collectionOne")
//!     .upsert(json!({"_id": "1234", "a": 1}).as_object().cloned().unwrap_or_default())
//!     .build();
//! lowla.load(SyncBatch::new(5, vec![page])).unwrap();
//!
//! let coll = lowla.collection("dbName", "collectionOne").unwrap();
//! let docs = coll.find_all().sort("a").to_array().unwrap();
//! assert_eq!(docs.len(), 1);
//! assert_eq!(lowla.sequence(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callback;
mod handle;

pub use callback::{
    complete, CollectionCallbacks, CollectionNamesOptions, CursorCallbacks, DatabaseCallbacks,
};
pub use handle::LowlaDB;

pub use lowladb_core::{
    Collection, CollectionInfo, Config, CoreError, CoreResult, Cursor, CursorOptions,
    CursorOverrides, Database, Document, EventBus, Filter, IdGenerator, ListenerId, LiveQuery,
    Lowla, Namespace, SortDirection, SortKey, SortSpec, ValidationError, PENDING_FIELD,
    SYNC_BEGIN, SYNC_END,
};
pub use lowladb_storage::{DocumentStore, MemoryStore, StorageError};
pub use lowladb_sync::{
    DecodedChange, DecodedPage, HttpClient, HttpTransport, LoadOutcome, LoadSource,
    MockTransport, PageBuilder, RetryConfig, SyncBatch, SyncConfig, SyncCycleResult, SyncEngine,
    SyncError, SyncPhase, SyncResult, SyncTransport,
};
