//! In-memory document store.

use crate::backend::DocumentStore;
use crate::document::{document_id, Document, Filter, SortSpec, UpdateSpec};
use crate::error::{StorageError, StorageResult};
use crate::query::{matches_filter, sort_documents};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory document store.
///
/// This store keeps every namespace as a vector of documents in insertion
/// order and is suitable for:
/// - Unit and integration tests
/// - Ephemeral databases that don't need persistence
/// - Tools that load a sync batch and query it
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use lowladb_storage::{DocumentStore, Filter, MemoryStore, SortSpec};
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// let doc = json!({"_id": "1", "a": 1}).as_object().cloned().unwrap();
/// store.insert("db.coll", vec![doc]).unwrap();
/// let found = store.find("db.coll", &Filter::new(), &SortSpec::none(), 0).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<BTreeMap<String, Vec<Document>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every document in `namespace`, in storage order.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn documents(&self, namespace: &str) -> Vec<Document> {
        self.namespaces
            .read()
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every namespace that currently exists.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }

    /// Closes the store. Every later operation fails with
    /// [`StorageError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns true if the store has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.is_closed() {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

fn in_database(namespace: &str, database: &str) -> bool {
    namespace
        .strip_prefix(database)
        .is_some_and(|rest| rest.starts_with('.'))
}

impl DocumentStore for MemoryStore {
    fn insert(&self, namespace: &str, docs: Vec<Document>) -> StorageResult<Vec<Document>> {
        self.check_open()?;
        let mut namespaces = self.namespaces.write();

        // Reject the whole call before writing anything, including the
        // namespace itself.
        let existing = namespaces.get(namespace);
        let mut incoming: Vec<&str> = Vec::with_capacity(docs.len());
        for doc in &docs {
            if let Some(id) = document_id(doc) {
                let exists = existing
                    .is_some_and(|stored| stored.iter().any(|d| document_id(d) == Some(id)));
                if exists || incoming.contains(&id) {
                    return Err(StorageError::DuplicateKey {
                        namespace: namespace.to_string(),
                        id: id.to_string(),
                    });
                }
                incoming.push(id);
            }
        }

        namespaces
            .entry(namespace.to_string())
            .or_default()
            .extend(docs.iter().cloned());
        Ok(docs)
    }

    fn find(
        &self,
        namespace: &str,
        filter: &Filter,
        sort: &SortSpec,
        limit: usize,
    ) -> StorageResult<Vec<Document>> {
        self.check_open()?;
        let namespaces = self.namespaces.read();
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for doc in stored {
            if matches_filter(doc, filter)? {
                matched.push(doc.clone());
            }
        }
        drop(namespaces);

        sort_documents(&mut matched, sort);
        if limit > 0 {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn count(&self, namespace: &str, filter: &Filter, limit: Option<usize>) -> StorageResult<usize> {
        self.check_open()?;
        let namespaces = self.namespaces.read();
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(0);
        };

        let mut count = 0;
        for doc in stored {
            if matches_filter(doc, filter)? {
                count += 1;
            }
        }
        Ok(match limit {
            Some(limit) if limit > 0 => count.min(limit),
            _ => count,
        })
    }

    fn remove(&self, namespace: &str, filter: &Filter) -> StorageResult<usize> {
        self.check_open()?;
        let mut namespaces = self.namespaces.write();
        let Some(stored) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };

        // Evaluate first so a bad filter leaves the namespace untouched.
        let mut keep = Vec::with_capacity(stored.len());
        for doc in stored.iter() {
            keep.push(!matches_filter(doc, filter)?);
        }

        let before = stored.len();
        let mut flags = keep.into_iter();
        stored.retain(|_| flags.next().unwrap_or(true));
        Ok(before - stored.len())
    }

    fn find_and_modify(
        &self,
        namespace: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StorageResult<Option<Document>> {
        self.check_open()?;
        let mut namespaces = self.namespaces.write();
        let Some(stored) = namespaces.get_mut(namespace) else {
            return Ok(None);
        };

        let mut position = None;
        for (index, doc) in stored.iter().enumerate() {
            if matches_filter(doc, filter)? {
                position = Some(index);
                break;
            }
        }
        let Some(index) = position else {
            return Ok(None);
        };

        let mut updated = stored[index].clone();
        update.apply(&mut updated)?;
        stored[index] = updated.clone();
        Ok(Some(updated))
    }

    fn collection_names(&self, database: &str) -> StorageResult<Vec<String>> {
        self.check_open()?;
        Ok(self
            .namespaces
            .read()
            .keys()
            .filter(|ns| in_database(ns, database))
            .map(|ns| ns[database.len() + 1..].to_string())
            .collect())
    }

    fn drop_database(&self, database: &str) -> StorageResult<()> {
        self.check_open()?;
        self.namespaces
            .write()
            .retain(|ns, _| !in_database(ns, database));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{id_filter, SortDirection, UpdateOp};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn filter(value: Value) -> Filter {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                "db.coll",
                vec![
                    doc(json!({"_id": "1", "a": 1})),
                    doc(json!({"_id": "2", "a": 2})),
                    doc(json!({"_id": "3", "a": 3})),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn memory_new_is_empty() {
        let store = MemoryStore::new();
        assert!(store.namespaces().is_empty());
        assert!(store.documents("db.coll").is_empty());
    }

    #[test]
    fn memory_insert_preserves_order() {
        let store = seeded();
        let ids: Vec<String> = store
            .documents("db.coll")
            .iter()
            .map(|d| d["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn memory_insert_duplicate_fails_without_writing() {
        let store = seeded();
        let result = store.insert(
            "db.coll",
            vec![doc(json!({"_id": "9"})), doc(json!({"_id": "1"}))],
        );
        assert!(matches!(result, Err(StorageError::DuplicateKey { .. })));
        assert_eq!(store.documents("db.coll").len(), 3);
    }

    #[test]
    fn memory_rejected_insert_does_not_create_namespace() {
        let store = seeded();
        let result = store.insert(
            "db.fresh",
            vec![doc(json!({"_id": "a"})), doc(json!({"_id": "a"}))],
        );
        assert!(matches!(result, Err(StorageError::DuplicateKey { .. })));
        assert!(!store.namespaces().contains(&"db.fresh".to_string()));
        assert_eq!(store.collection_names("db").unwrap(), vec!["coll"]);
    }

    #[test]
    fn memory_find_sorts_and_limits() {
        let store = seeded();
        let found = store
            .find(
                "db.coll",
                &Filter::new(),
                &SortSpec::from(("a", SortDirection::Descending)),
                2,
            )
            .unwrap();
        let values: Vec<i64> = found.iter().map(|d| d["a"].as_i64().unwrap()).collect();
        assert_eq!(values, vec![3, 2]);
    }

    #[test]
    fn memory_find_unknown_namespace_is_empty() {
        let store = seeded();
        let found = store
            .find("db.other", &Filter::new(), &SortSpec::none(), 0)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn memory_count_with_limit() {
        let store = seeded();
        assert_eq!(store.count("db.coll", &Filter::new(), None).unwrap(), 3);
        assert_eq!(store.count("db.coll", &Filter::new(), Some(2)).unwrap(), 2);
        assert_eq!(store.count("db.coll", &Filter::new(), Some(0)).unwrap(), 3);
        assert_eq!(
            store.count("db.coll", &filter(json!({"a": 2})), None).unwrap(),
            1
        );
    }

    #[test]
    fn memory_remove_matching() {
        let store = seeded();
        assert_eq!(store.remove("db.coll", &filter(json!({"a": 2}))).unwrap(), 1);
        assert_eq!(store.documents("db.coll").len(), 2);
        assert_eq!(store.remove("db.coll", &Filter::new()).unwrap(), 2);
        assert!(store.namespaces().contains(&"db.coll".to_string()));
    }

    #[test]
    fn memory_remove_bad_filter_leaves_data() {
        let store = seeded();
        let result = store.remove("db.coll", &filter(json!({"a": {"$bogus": 1}})));
        assert!(result.is_err());
        assert_eq!(store.documents("db.coll").len(), 3);
    }

    #[test]
    fn memory_find_and_modify_first_match_only() {
        let store = seeded();
        let update = UpdateSpec::Operators(vec![UpdateOp::Set {
            path: "b".into(),
            value: json!(true),
        }]);
        let updated = store
            .find_and_modify("db.coll", &filter(json!({"a": {"$gte": 2}})), &update)
            .unwrap()
            .unwrap();
        assert_eq!(updated["_id"], json!("2"));
        let docs = store.documents("db.coll");
        assert!(docs[2].get("b").is_none());
    }

    #[test]
    fn memory_find_and_modify_no_match() {
        let store = seeded();
        let update = UpdateSpec::Replace(doc(json!({"x": 1})));
        let result = store
            .find_and_modify("db.coll", &id_filter("missing"), &update)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn memory_collection_names_and_drop() {
        let store = seeded();
        store.insert("db.other", vec![doc(json!({"_id": "x"}))]).unwrap();
        store.insert("dbx.coll", vec![doc(json!({"_id": "y"}))]).unwrap();

        let mut names = store.collection_names("db").unwrap();
        names.sort();
        assert_eq!(names, vec!["coll", "other"]);

        store.drop_database("db").unwrap();
        assert!(store.collection_names("db").unwrap().is_empty());
        assert_eq!(store.collection_names("dbx").unwrap(), vec!["coll"]);
    }

    #[test]
    fn memory_close_rejects_operations() {
        let store = seeded();
        store.close();
        assert!(matches!(
            store.count("db.coll", &Filter::new(), None),
            Err(StorageError::Closed)
        ));
    }
}
