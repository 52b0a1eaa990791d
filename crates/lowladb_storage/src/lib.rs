//! # LowlaDB Storage
//!
//! The storage collaborator contract and a reference in-memory engine.
//!
//! This crate is the lowest layer of LowlaDB. A [`DocumentStore`] keeps
//! documents per namespace and executes raw filter, sort and limit requests.
//! It knows nothing about cursors, live queries or sync.
//!
//! ## Design Principles
//!
//! - Documents are JSON objects keyed by a string `_id`
//! - Namespaces are passed as `db.collection` strings
//! - Storage order is insertion order and is stable
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Engines
//!
//! - [`MemoryStore`] - For testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use lowladb_storage::{DocumentStore, Filter, MemoryStore, SortSpec};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! let doc = json!({"_id": "a", "n": 1}).as_object().cloned().unwrap();
//! store.insert("db.items", vec![doc]).unwrap();
//! assert_eq!(store.count("db.items", &Filter::new(), None).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod document;
mod error;
mod memory;
pub mod query;

pub use backend::DocumentStore;
pub use document::{
    document_id, id_filter, Document, Filter, SortDirection, SortKey, SortSpec, UpdateOp,
    UpdateSpec, ID_FIELD,
};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
