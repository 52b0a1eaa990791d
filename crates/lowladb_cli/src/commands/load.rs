//! Load command implementation.

use crate::error::CliResult;
use crate::transport::FileTransport;
use lowladb::{Document, LoadOutcome, LowlaDB, Namespace, SortDirection};
use std::path::Path;

/// Options for the load command.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Namespace whose documents are printed after loading.
    pub namespace: Option<String>,
    /// Field to sort printed documents by.
    pub sort: Option<String>,
    /// Sort descending.
    pub descending: bool,
    /// Maximum number of documents to print (0 = all).
    pub limit: usize,
}

/// Loads the batch at `path` into a fresh in-memory database.
///
/// Returns the handle, the load outcome and, if a namespace was requested,
/// its documents after the load.
pub fn load(
    path: &Path,
    options: &LoadOptions,
) -> CliResult<(LowlaDB<FileTransport>, LoadOutcome, Option<Vec<Document>>)> {
    let lowla = LowlaDB::in_memory(FileTransport);
    let outcome = lowla.load(path.display().to_string())?;

    let documents = match &options.namespace {
        Some(ns) => {
            let namespace = Namespace::parse(ns)?;
            let mut cursor = lowla
                .lowla()
                .collection_for(namespace)
                .find_all()
                .limit(options.limit);
            if let Some(field) = &options.sort {
                let direction = if options.descending {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                cursor = cursor.sort((field.as_str(), direction));
            }
            Some(cursor.to_array()?)
        }
        None => None,
    };
    Ok((lowla, outcome, documents))
}

/// Runs the load command.
pub fn run(path: &Path, options: &LoadOptions) -> CliResult<()> {
    let (lowla, outcome, documents) = load(path, options)?;

    println!("Sequence: {}", lowla.sequence());
    println!(
        "Applied {} page(s): {} upserted, {} deleted",
        outcome.pages_applied, outcome.documents_upserted, outcome.documents_deleted
    );
    for doc in documents.unwrap_or_default() {
        println!("{}", serde_json::to_string(&doc)?);
    }

    lowla.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowladb::{PageBuilder, SyncBatch};
    use serde_json::{json, Value};
    use std::io::Write;

    fn batch_file() -> tempfile::NamedTempFile {
        let docs = (1..=5).map(|i| json!({"_id": format!("d{i}"), "n": i}).as_object().cloned().unwrap());
        let first = PageBuilder::new("shop.items").upsert_all(docs).build();
        let second = PageBuilder::new("shop.items").delete("d2").build();
        let batch = SyncBatch::new(40, vec![first, second]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(batch.to_json().as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_queries_namespace() {
        let file = batch_file();
        let options = LoadOptions {
            namespace: Some("shop.items".into()),
            sort: Some("n".into()),
            descending: true,
            limit: 2,
        };
        let (lowla, outcome, docs) = load(file.path(), &options).unwrap();

        assert_eq!(lowla.sequence(), 40);
        assert_eq!(outcome.pages_applied, 2);
        assert_eq!(outcome.documents_upserted, 5);
        assert_eq!(outcome.documents_deleted, 1);
        let ns: Vec<Value> = docs.unwrap().iter().map(|d| d["n"].clone()).collect();
        assert_eq!(ns, vec![json!(5), json!(4)]);
    }

    #[test]
    fn ascending_without_limit_returns_every_live_document() {
        let file = batch_file();
        let options = LoadOptions {
            namespace: Some("shop.items".into()),
            sort: Some("n".into()),
            ..LoadOptions::default()
        };
        let (_, _, docs) = load(file.path(), &options).unwrap();

        let ns: Vec<Value> = docs.unwrap().iter().map(|d| d["n"].clone()).collect();
        assert_eq!(ns, vec![json!(1), json!(3), json!(4), json!(5)]);
    }

    #[test]
    fn without_namespace_prints_nothing() {
        let file = batch_file();
        let (_, _, docs) = load(file.path(), &LoadOptions::default()).unwrap();
        assert!(docs.is_none());
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let file = batch_file();
        let options = LoadOptions {
            namespace: Some("nodot".into()),
            ..LoadOptions::default()
        };
        assert!(load(file.path(), &options).is_err());
    }
}
