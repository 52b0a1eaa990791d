//! The sync engine.

use crate::applier::PageApplier;
use crate::batch::SyncBatch;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::state::{LoadOutcome, LoadSource, SyncCycleResult, SyncPhase, SyncStats};
use crate::transport::SyncTransport;
use lowladb_core::{CoreError, Lowla, SYNC_BEGIN, SYNC_END};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Pulls change batches into a LowlaDB handle.
///
/// # Lifecycle
///
/// ```text
/// Idle ─► Loading ─► Applying ─► Synced
///            │  ▲        │
///            ▼  │        ▼
///        RetryWait     Error
/// ```
///
/// Only one load or sync runs at a time per engine; a second call while one
/// is active fails with [`SyncError::InvalidStateTransition`].
pub struct SyncEngine<T: SyncTransport> {
    lowla: Lowla,
    transport: T,
    config: SyncConfig,
    applier: PageApplier,
    phase: RwLock<SyncPhase>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<T: SyncTransport> SyncEngine<T> {
    /// Creates an engine with the default configuration.
    pub fn new(lowla: Lowla, transport: T) -> Self {
        Self::with_config(lowla, transport, SyncConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(lowla: Lowla, transport: T, config: SyncConfig) -> Self {
        Self {
            applier: PageApplier::new(lowla.clone()),
            lowla,
            transport,
            config,
            phase: RwLock::new(SyncPhase::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the last fully applied batch sequence.
    pub fn sequence(&self) -> u64 {
        self.lowla.sync_state().sequence()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the database handle the engine writes into.
    pub fn lowla(&self) -> &Lowla {
        &self.lowla
    }

    /// Requests cancellation of the running load or sync.
    ///
    /// Checked between fetch attempts, pages and cycles.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write() = phase;
    }

    fn begin(&self, operation: &str) -> SyncResult<()> {
        let mut phase = self.phase.write();
        if !phase.can_start() {
            return Err(SyncError::InvalidStateTransition {
                from: phase.to_string(),
                to: operation.into(),
            });
        }
        *phase = SyncPhase::Loading;
        self.cancelled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn finish<R>(&self, result: &SyncResult<R>) {
        match result {
            Ok(_) => {
                self.set_phase(SyncPhase::Synced);
                let mut stats = self.stats.write();
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
            }
            Err(e) => self.handle_error(e),
        }
    }

    fn handle_error(&self, error: &SyncError) {
        self.set_phase(SyncPhase::Error);
        self.stats.write().last_error = Some(error.to_string());
    }

    /// Loads one batch, given directly or fetched from a locator.
    ///
    /// A locator is fetched as-is; no sequence parameter is added. The sync
    /// sequence advances to the batch's sequence only after every page has
    /// been applied.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Network`] or [`SyncError::Protocol`] if the batch
    ///   cannot be fetched or decoded; nothing is applied.
    /// - [`SyncError::Aborted`] if a page fails to apply; earlier pages stay
    ///   applied and the sequence is unchanged.
    /// - [`SyncError::InvalidStateTransition`] if another load is running.
    pub fn load(&self, source: impl Into<LoadSource>) -> SyncResult<LoadOutcome> {
        self.begin("load")?;
        let result = self.load_batch(source.into());
        self.finish(&result);
        result
    }

    /// Runs load cycles against `url` until caught up.
    ///
    /// Emits `syncBegin` before anything else and `syncEnd` after the last
    /// cycle, whether it succeeded or failed. Each cycle requests
    /// `url?<sequence_param>=<sequence>`. Cycles stop when a batch has no
    /// pages, when its sequence does not move past the current one, or
    /// after `max_cycles`.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing cycle, after `syncEnd` has fired.
    /// Batches applied by earlier cycles stay applied.
    pub fn sync(&self, url: &str) -> SyncResult<SyncCycleResult> {
        self.lowla.events().emit(SYNC_BEGIN, &[]);
        tracing::debug!(url, sequence = self.sequence(), "sync begin");

        let result = self.begin("sync").and_then(|()| {
            let result = self.run_cycles(url);
            self.finish(&result);
            result
        });

        match &result {
            Ok(cycle) => {
                self.stats.write().cycles_completed += 1;
                tracing::debug!(
                    batches = cycle.batches,
                    pages = cycle.pages_applied,
                    sequence = cycle.sequence,
                    "sync end"
                );
            }
            Err(e) => tracing::debug!(error = %e, "sync failed"),
        }
        self.lowla.events().emit(SYNC_END, &[]);
        result
    }

    /// Builds the locator for a cycle starting at `sequence`.
    pub fn locator(&self, url: &str, sequence: u64) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{}={sequence}", self.config.sequence_param)
    }

    fn run_cycles(&self, url: &str) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();
        let mut result = SyncCycleResult::default();

        for _ in 0..self.config.max_cycles {
            self.check_cancelled()?;
            let since = self.sequence();
            let outcome = self.load_batch(LoadSource::Locator(self.locator(url, since)))?;
            result.record(&outcome);

            if outcome.pages_applied == 0 || !outcome.advanced() {
                break;
            }
            self.set_phase(SyncPhase::Loading);
        }

        result.sequence = self.sequence();
        result.duration = start.elapsed();
        Ok(result)
    }

    fn load_batch(&self, source: LoadSource) -> SyncResult<LoadOutcome> {
        if self.lowla.is_closed() {
            return Err(CoreError::Closed.into());
        }
        let batch = match source {
            LoadSource::Batch(batch) => batch,
            LoadSource::Locator(locator) => self.fetch_batch(&locator)?,
        };
        self.apply_batch(&batch)
    }

    fn fetch_batch(&self, locator: &str) -> SyncResult<SyncBatch> {
        let retry = &self.config.retry;
        let attempts = retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                self.set_phase(SyncPhase::RetryWait);
                std::thread::sleep(retry.delay_for_attempt(attempt));
                self.stats.write().retries += 1;
                self.set_phase(SyncPhase::Loading);
            }
            self.check_cancelled()?;

            match self.transport.fetch(locator) {
                Ok(text) => {
                    let batch = SyncBatch::from_json(&text)?;
                    tracing::debug!(
                        locator,
                        sequence = batch.sequence,
                        pages = batch.page_count(),
                        "batch fetched"
                    );
                    return Ok(batch);
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    tracing::debug!(locator, attempt, error = %e, "fetch failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn apply_batch(&self, batch: &SyncBatch) -> SyncResult<LoadOutcome> {
        let pages = batch.decode()?;
        self.set_phase(SyncPhase::Applying);

        let mut outcome = LoadOutcome {
            sequence: batch.sequence,
            previous_sequence: self.sequence(),
            ..LoadOutcome::default()
        };

        for (index, page) in pages.iter().enumerate() {
            if let Err(e) = self.check_cancelled() {
                return Err(if index == 0 { e } else { SyncError::aborted(index, e) });
            }
            let applied = self
                .applier
                .apply_page(page)
                .map_err(|e| SyncError::aborted(index, e.into()))?;
            tracing::trace!(
                page = index,
                upserted = applied.upserted,
                deleted = applied.deleted,
                "page applied"
            );

            outcome.pages_applied += 1;
            outcome.documents_upserted += applied.upserted;
            outcome.documents_deleted += applied.deleted;
            for namespace in applied.namespaces {
                if !outcome.namespaces.contains(&namespace) {
                    outcome.namespaces.push(namespace);
                }
            }
        }

        let sequence = self.lowla.sync_state().advance_to(batch.sequence);
        tracing::debug!(
            sequence,
            pages = outcome.pages_applied,
            "sequence advanced"
        );

        let mut stats = self.stats.write();
        stats.batches_applied += 1;
        stats.pages_applied += outcome.pages_applied as u64;
        stats.documents_upserted += outcome.documents_upserted as u64;
        stats.documents_deleted += outcome.documents_deleted as u64;
        Ok(outcome)
    }
}

impl<T: SyncTransport> std::fmt::Debug for SyncEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("phase", &self.phase())
            .field("sequence", &self.sequence())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PageBuilder;
    use crate::config::RetryConfig;
    use crate::transport::MockTransport;
    use lowladb_core::Document;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn batch(sequence: u64, ids: &[&str]) -> SyncBatch {
        let page = PageBuilder::new("db.c")
            .upsert_all(ids.iter().map(|id| doc(json!({"_id": id}))))
            .build();
        SyncBatch::new(sequence, vec![page])
    }

    #[test]
    fn engine_initial_state() {
        let engine = SyncEngine::new(Lowla::in_memory(), MockTransport::new());
        assert_eq!(engine.phase(), SyncPhase::Idle);
        assert_eq!(engine.sequence(), 0);
        assert_eq!(engine.stats().batches_applied, 0);
    }

    #[test]
    fn load_batch_advances_sequence() {
        let engine = SyncEngine::new(Lowla::in_memory(), MockTransport::new());
        let outcome = engine.load(batch(5, &["1", "2"])).unwrap();
        assert_eq!(outcome.sequence, 5);
        assert_eq!(outcome.documents_upserted, 2);
        assert_eq!(engine.sequence(), 5);
        assert_eq!(engine.phase(), SyncPhase::Synced);
    }

    #[test]
    fn sequence_never_regresses() {
        let engine = SyncEngine::new(Lowla::in_memory(), MockTransport::new());
        engine.load(batch(9, &["1"])).unwrap();
        engine.load(batch(3, &["2"])).unwrap();
        assert_eq!(engine.sequence(), 9);
    }

    #[test]
    fn locator_building() {
        let engine = SyncEngine::new(Lowla::in_memory(), MockTransport::new());
        assert_eq!(engine.locator("http://h/changes", 4), "http://h/changes?sequence=4");
        assert_eq!(engine.locator("http://h/c?x=1", 0), "http://h/c?x=1&sequence=0");
    }

    #[test]
    fn retry_recovers_from_transient_failure() {
        let transport = MockTransport::new();
        transport.push_failure("connection reset", true);
        transport.push_batch(&batch(2, &["1"]));
        let config = SyncConfig::new().with_retry(
            RetryConfig::new(3)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        );
        let engine = SyncEngine::with_config(Lowla::in_memory(), transport, config);

        engine.load("http://h/a").unwrap();
        assert_eq!(engine.stats().retries, 1);
        assert_eq!(engine.sequence(), 2);
    }

    #[test]
    fn fatal_fetch_is_not_retried() {
        let transport = MockTransport::new();
        transport.push_failure("Invalid URL", false);
        transport.push_batch(&batch(2, &["1"]));
        let config = SyncConfig::new().with_retry(RetryConfig::new(3));
        let engine = SyncEngine::with_config(Lowla::in_memory(), transport, config);

        let err = engine.load("http://h/a").unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
        assert_eq!(engine.transport().remaining(), 1);
        assert_eq!(engine.phase(), SyncPhase::Error);
        assert_eq!(engine.stats().last_error.as_deref(), Some("network error: Invalid URL"));
    }

    #[test]
    fn cancelled_during_apply_reports_progress() {
        let lowla = Lowla::in_memory();
        let engine = std::sync::Arc::new(SyncEngine::new(lowla.clone(), MockTransport::new()));

        let canceller = std::sync::Arc::downgrade(&engine);
        let _live = lowla
            .collection("db", "c")
            .unwrap()
            .find_all()
            .on(move |cursor| {
                if cursor.count(false).unwrap() > 0 {
                    if let Some(engine) = canceller.upgrade() {
                        engine.cancel();
                    }
                }
            })
            .unwrap();

        let pages = vec![
            PageBuilder::new("db.c").upsert(doc(json!({"_id": "1"}))).build(),
            PageBuilder::new("db.c").upsert(doc(json!({"_id": "2"}))).build(),
        ];
        let err = engine.load(SyncBatch::new(7, pages)).unwrap_err();
        assert!(matches!(err, SyncError::Aborted { pages_applied: 1, .. }));
        assert_eq!(engine.sequence(), 0);
        lowla.close();
    }

    #[test]
    fn reentrant_load_is_rejected() {
        let lowla = Lowla::in_memory();
        let engine = std::sync::Arc::new(SyncEngine::new(lowla.clone(), MockTransport::new()));
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(None));

        let inner = std::sync::Arc::downgrade(&engine);
        let sink = std::sync::Arc::clone(&seen);
        let _live = lowla
            .collection("db", "c")
            .unwrap()
            .find_all()
            .on(move |cursor| {
                if cursor.count(false).unwrap() == 0 {
                    return;
                }
                if let Some(engine) = inner.upgrade() {
                    let result = engine.load(SyncBatch::new(1, Vec::new()));
                    *sink.lock() = Some(matches!(
                        result,
                        Err(SyncError::InvalidStateTransition { .. })
                    ));
                }
            })
            .unwrap();

        engine.load(batch(1, &["1"])).unwrap();
        assert_eq!(*seen.lock(), Some(true));
        lowla.close();
    }
}
