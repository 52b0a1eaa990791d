//! # LowlaDB Sync Engine
//!
//! Incremental, resumable sync of remote change batches into a LowlaDB
//! handle.
//!
//! This crate provides:
//! - The batch wire format and its decoder
//! - Id normalization (`<clientNs>$<key>`)
//! - Page application through the collection sync path
//! - Sequence tracking and `syncBegin`/`syncEnd` events
//! - Retry with exponential backoff for fetches
//! - HTTP transport abstraction
//!
//! ## Key Invariants
//!
//! - Pages apply strictly in order, one at a time
//! - Live queries are notified once per namespace per page
//! - The sequence advances only after a whole batch applies
//! - A failed batch keeps the pages it already applied
//!
//! ## Example
//!
//! ```
//! use lowladb_core::Lowla;
//! use lowladb_sync::{MockTransport, PageBuilder, SyncBatch, SyncEngine};
//! use serde_json::json;
//!
//! let lowla = Lowla::in_memory();
//! let engine = SyncEngine::new(lowla.clone(), MockTransport::new());
//!
//! let page = PageBuilder::new("dbName.Coll")
//!     .upsert(json!({"_id": "1234", "a": 1}).as_object().cloned().unwrap_or_default())
//!     .build();
//! engine.load(SyncBatch::new(5, vec![page])).unwrap();
//!
//! assert_eq!(engine.sequence(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod batch;
mod config;
mod engine;
mod error;
mod http;
mod state;
mod transport;

pub use applier::{PageApplier, PageOutcome};
pub use batch::{
    document_key, normalize_id, DecodedChange, DecodedPage, PageBuilder, SyncBatch,
    SyncBatchEntry, ID_SEPARATOR,
};
pub use config::{RetryConfig, SyncConfig};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use http::{is_http_url, HttpClient, HttpTransport};
pub use state::{LoadOutcome, LoadSource, SyncCycleResult, SyncPhase, SyncStats};
pub use transport::{MockTransport, SyncTransport};
