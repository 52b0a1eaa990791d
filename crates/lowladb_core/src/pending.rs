//! Tracking of documents with local changes not yet confirmed by sync.

use crate::types::Namespace;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// The set of `(namespace, _id)` pairs modified locally since the last
/// sync touched them.
#[derive(Debug, Default)]
pub struct PendingChanges {
    documents: RwLock<HashMap<Namespace, HashSet<String>>>,
}

impl PendingChanges {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a document as locally modified.
    pub fn mark(&self, namespace: &Namespace, id: &str) {
        self.documents
            .write()
            .entry(namespace.clone())
            .or_default()
            .insert(id.to_string());
    }

    /// Clears the pending mark of one document.
    pub fn clear(&self, namespace: &Namespace, id: &str) {
        let mut documents = self.documents.write();
        if let Some(ids) = documents.get_mut(namespace) {
            ids.remove(id);
            if ids.is_empty() {
                documents.remove(namespace);
            }
        }
    }

    /// Clears every pending mark in `database`.
    pub fn clear_database(&self, database: &str) {
        self.documents
            .write()
            .retain(|ns, _| ns.database() != database);
    }

    /// Returns true if the document has a pending local change.
    pub fn is_pending(&self, namespace: &Namespace, id: &str) -> bool {
        self.documents
            .read()
            .get(namespace)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Returns the number of pending documents across all namespaces.
    pub fn len(&self) -> usize {
        self.documents.read().values().map(HashSet::len).sum()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_clear() {
        let pending = PendingChanges::new();
        let ns = Namespace::new("db", "c").unwrap();
        pending.mark(&ns, "1");
        pending.mark(&ns, "1");
        assert!(pending.is_pending(&ns, "1"));
        assert_eq!(pending.len(), 1);

        pending.clear(&ns, "1");
        assert!(!pending.is_pending(&ns, "1"));
        assert!(pending.is_empty());
    }

    #[test]
    fn clear_database_keeps_other_databases() {
        let pending = PendingChanges::new();
        let a = Namespace::new("a", "c").unwrap();
        let b = Namespace::new("b", "c").unwrap();
        pending.mark(&a, "1");
        pending.mark(&b, "1");

        pending.clear_database("a");
        assert!(!pending.is_pending(&a, "1"));
        assert!(pending.is_pending(&b, "1"));
    }
}
