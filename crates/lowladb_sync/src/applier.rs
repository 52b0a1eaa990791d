//! Applies decoded pages to a LowlaDB handle.

use crate::batch::{DecodedChange, DecodedPage};
use lowladb_core::{CoreResult, Lowla, Namespace};

/// Counts from one applied page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Documents inserted or replaced.
    pub upserted: usize,
    /// Deletions processed, including deletions of absent documents.
    pub deleted: usize,
    /// Namespaces touched, in first-touch order.
    pub namespaces: Vec<Namespace>,
}

/// Writes sync changes through the collection sync path.
///
/// Upserts keep the document's own `_id` and skip `$` validation. Live
/// queries are notified once per distinct namespace after each page.
#[derive(Debug, Clone)]
pub struct PageApplier {
    lowla: Lowla,
}

impl PageApplier {
    /// Creates an applier writing into `lowla`.
    pub fn new(lowla: Lowla) -> Self {
        Self { lowla }
    }

    /// Applies one page in order.
    ///
    /// On failure the changes already written stay applied and their
    /// namespaces are still notified.
    ///
    /// # Errors
    ///
    /// Returns the first storage or validation error.
    pub fn apply_page(&self, page: &DecodedPage) -> CoreResult<PageOutcome> {
        let mut outcome = PageOutcome::default();
        let result = page
            .changes
            .iter()
            .try_for_each(|change| self.apply_change(change, &mut outcome));

        for namespace in &outcome.namespaces {
            let delivered = self.lowla.live().notify(namespace);
            tracing::trace!(namespace = %namespace, delivered, "page notification");
        }
        result.map(|()| outcome)
    }

    fn apply_change(&self, change: &DecodedChange, outcome: &mut PageOutcome) -> CoreResult<()> {
        let collection = self.lowla.collection_for(change.namespace().clone());
        match change {
            DecodedChange::Upsert { document, .. } => {
                collection.upsert_remote(document.clone())?;
                outcome.upserted += 1;
            }
            DecodedChange::Delete { .. } => {
                collection.delete_remote(change.key())?;
                outcome.deleted += 1;
            }
        }
        if !outcome.namespaces.contains(change.namespace()) {
            outcome.namespaces.push(change.namespace().clone());
        }
        Ok(())
    }
}
