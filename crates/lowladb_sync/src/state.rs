//! Sync engine phases, statistics and results.

use crate::batch::SyncBatch;
use lowladb_core::Namespace;
use std::fmt;
use std::time::{Duration, Instant};

/// The current phase of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is fetching or decoding a batch.
    Loading,
    /// Engine is writing pages into the database.
    Applying,
    /// The last load or sync completed.
    Synced,
    /// The last load or sync failed.
    Error,
    /// Engine is waiting before retrying a fetch.
    RetryWait,
}

impl SyncPhase {
    /// Returns true if the engine is in an active phase.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncPhase::Loading | SyncPhase::Applying | SyncPhase::RetryWait
        )
    }

    /// Returns true if the engine can start a new load.
    pub fn can_start(&self) -> bool {
        matches!(self, SyncPhase::Idle | SyncPhase::Synced | SyncPhase::Error)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Number of `sync` calls that completed.
    pub cycles_completed: u64,
    /// Number of batches fully applied.
    pub batches_applied: u64,
    /// Number of pages fully applied.
    pub pages_applied: u64,
    /// Documents inserted or replaced by sync.
    pub documents_upserted: u64,
    /// Deletions processed by sync.
    pub documents_deleted: u64,
    /// Fetch retries performed.
    pub retries: u64,
    /// Last successful load or sync.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Where a `load` gets its batch from.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    /// An already decoded batch.
    Batch(SyncBatch),
    /// A locator fetched through the transport.
    Locator(String),
}

impl From<SyncBatch> for LoadSource {
    fn from(batch: SyncBatch) -> Self {
        Self::Batch(batch)
    }
}

impl From<String> for LoadSource {
    fn from(locator: String) -> Self {
        Self::Locator(locator)
    }
}

impl From<&str> for LoadSource {
    fn from(locator: &str) -> Self {
        Self::Locator(locator.to_string())
    }
}

/// Result of one applied batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// The batch's sequence.
    pub sequence: u64,
    /// The sync sequence before this batch.
    pub previous_sequence: u64,
    /// Pages applied.
    pub pages_applied: usize,
    /// Documents inserted or replaced.
    pub documents_upserted: usize,
    /// Deletions processed.
    pub documents_deleted: usize,
    /// Distinct namespaces touched, in first-touch order.
    pub namespaces: Vec<Namespace>,
}

impl LoadOutcome {
    /// Returns true if the batch moved the sync sequence forward.
    pub fn advanced(&self) -> bool {
        self.sequence > self.previous_sequence
    }
}

/// Result of a `sync` call.
#[derive(Debug, Clone, Default)]
pub struct SyncCycleResult {
    /// Batches loaded.
    pub batches: u32,
    /// Pages applied across all batches.
    pub pages_applied: usize,
    /// Documents inserted or replaced.
    pub documents_upserted: usize,
    /// Deletions processed.
    pub documents_deleted: usize,
    /// Sync sequence after the last batch.
    pub sequence: u64,
    /// Duration of the sync.
    pub duration: Duration,
}

impl SyncCycleResult {
    pub(crate) fn record(&mut self, outcome: &LoadOutcome) {
        self.batches += 1;
        self.pages_applied += outcome.pages_applied;
        self.documents_upserted += outcome.documents_upserted;
        self.documents_deleted += outcome.documents_deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_checks() {
        assert!(!SyncPhase::Idle.is_active());
        assert!(SyncPhase::Loading.is_active());
        assert!(SyncPhase::Applying.is_active());
        assert!(SyncPhase::RetryWait.is_active());
        assert!(!SyncPhase::Synced.is_active());

        assert!(SyncPhase::Idle.can_start());
        assert!(SyncPhase::Synced.can_start());
        assert!(SyncPhase::Error.can_start());
        assert!(!SyncPhase::Applying.can_start());
    }

    #[test]
    fn load_source_conversions() {
        assert_eq!(
            LoadSource::from("http://x"),
            LoadSource::Locator("http://x".into())
        );
        let batch = SyncBatch::new(2, Vec::new());
        assert_eq!(LoadSource::from(batch.clone()), LoadSource::Batch(batch));
    }

    #[test]
    fn cycle_result_accumulates() {
        let mut result = SyncCycleResult::default();
        let outcome = LoadOutcome {
            sequence: 4,
            previous_sequence: 1,
            pages_applied: 2,
            documents_upserted: 5,
            documents_deleted: 1,
            namespaces: Vec::new(),
        };
        assert!(outcome.advanced());
        result.record(&outcome);
        result.record(&outcome);
        assert_eq!(result.batches, 2);
        assert_eq!(result.pages_applied, 4);
        assert_eq!(result.documents_upserted, 10);
        assert_eq!(result.documents_deleted, 2);
    }
}
