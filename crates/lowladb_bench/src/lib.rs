//! Benchmark utilities.

#![warn(missing_docs)]

use lowladb_core::{Collection, CoreResult, Document, Lowla};
use lowladb_sync::{PageBuilder, SyncBatch};
use rand::Rng;
use serde_json::json;

/// Generate `count` documents with a random numeric `score` and a string
/// `name`. Roughly one in ten documents has no `score`.
pub fn random_documents(count: usize) -> Vec<Document> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let value = if rng.gen_ratio(1, 10) {
                json!({ "name": format!("doc{i}") })
            } else {
                json!({ "name": format!("doc{i}"), "score": rng.gen_range(0..10_000) })
            };
            value.as_object().cloned().unwrap_or_default()
        })
        .collect()
}

/// Create an in-memory database with one populated collection.
pub fn populated_collection(count: usize) -> CoreResult<(Lowla, Collection)> {
    let lowla = Lowla::in_memory();
    let coll = lowla.collection("bench", "docs")?;
    coll.insert_many(random_documents(count))?;
    Ok((lowla, coll))
}

/// Build a batch of `pages` pages with `per_page` upserts each, keyed so
/// successive batches replace the same documents.
pub fn sync_batch(sequence: u64, pages: usize, per_page: usize) -> SyncBatch {
    let documents = (0..pages)
        .map(|p| {
            let docs = random_documents(per_page)
                .into_iter()
                .enumerate()
                .map(|(i, mut doc)| {
                    doc.insert("_id".into(), json!(format!("p{p}-{i}")));
                    doc
                });
            PageBuilder::new("bench.synced").upsert_all(docs).build()
        })
        .collect();
    SyncBatch::new(sequence, documents)
}
