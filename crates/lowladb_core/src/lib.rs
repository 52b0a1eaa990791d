//! # LowlaDB Core
//!
//! Collections, cursors and live queries for LowlaDB.
//!
//! This crate provides:
//! - The namespace model (`db.collection`)
//! - Composable cursors with sort, limit and pending markers
//! - Live queries that re-deliver cursors after every mutation
//! - Collection operations with `$` field and update validation
//! - The event bus and sync position used by the sync engine
//!
//! Physical storage and raw query execution belong to a
//! [`lowladb_storage::DocumentStore`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod cursor;
mod database;
mod error;
mod events;
mod live;
mod pending;
mod state;
mod types;
pub mod update;

pub use collection::Collection;
pub use config::{Config, IdGenerator};
pub use cursor::{Cursor, CursorOptions, CursorOverrides, PENDING_FIELD};
pub use database::{CollectionInfo, Database, Lowla};
pub use error::{CoreError, CoreResult, ValidationError};
pub use events::{EventBus, Listener, ListenerId, SYNC_BEGIN, SYNC_END};
pub use live::{LiveCallback, LiveQuery, LiveQueryRegistry};
pub use pending::PendingChanges;
pub use state::SyncState;
pub use types::Namespace;

pub use lowladb_storage::{Document, Filter, SortDirection, SortKey, SortSpec};
