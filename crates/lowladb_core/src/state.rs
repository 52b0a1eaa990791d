//! Resumable sync position.

use std::sync::atomic::{AtomicU64, Ordering};

/// The sequence of the last fully applied sync batch.
///
/// The sequence only moves forward; advancing to a lower value is a no-op.
#[derive(Debug, Default)]
pub struct SyncState {
    sequence: AtomicU64,
}

impl SyncState {
    /// Creates a state at sequence 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current sequence.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Advances to `sequence` if it is higher than the current value.
    /// Returns the sequence in effect afterwards.
    pub fn advance_to(&self, sequence: u64) -> u64 {
        let previous = self.sequence.fetch_max(sequence, Ordering::SeqCst);
        previous.max(sequence)
    }
}
