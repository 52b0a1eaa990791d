//! Inspect command implementation.

use crate::error::CliResult;
use crate::transport::FileTransport;
use lowladb::{DecodedPage, SyncBatch, SyncTransport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Batch inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Batch file path.
    pub path: String,
    /// Sequence carried by the batch.
    pub sequence: u64,
    /// Number of pages.
    pub pages: usize,
    /// Total number of changes.
    pub changes: usize,
    /// Per-namespace counts, sorted by namespace.
    pub namespaces: Vec<NamespaceStats>,
}

/// Change counts for one namespace.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct NamespaceStats {
    /// Qualified namespace.
    pub namespace: String,
    /// Upserts targeting the namespace.
    pub upserts: usize,
    /// Deletions targeting the namespace.
    pub deletes: usize,
}

/// Decodes the batch at `path` and summarizes it.
pub fn inspect(path: &Path) -> CliResult<InspectResult> {
    let locator = path.display().to_string();
    let batch = SyncBatch::from_json(&FileTransport.fetch(&locator)?)?;
    let pages = batch.decode()?;
    Ok(summarize(locator, &batch, &pages))
}

fn summarize(path: String, batch: &SyncBatch, pages: &[DecodedPage]) -> InspectResult {
    let mut by_namespace: BTreeMap<String, NamespaceStats> = BTreeMap::new();
    let mut changes = 0;
    for change in pages.iter().flat_map(|p| &p.changes) {
        changes += 1;
        let name = change.namespace().to_string();
        let stats = by_namespace
            .entry(name.clone())
            .or_insert_with(|| NamespaceStats {
                namespace: name,
                ..NamespaceStats::default()
            });
        if change.is_delete() {
            stats.deletes += 1;
        } else {
            stats.upserts += 1;
        }
    }

    InspectResult {
        path,
        sequence: batch.sequence,
        pages: pages.len(),
        changes,
        namespaces: by_namespace.into_values().collect(),
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> CliResult<()> {
    let result = inspect(path)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("LowlaDB Batch Inspection");
    println!("========================");
    println!();
    println!("Path:     {}", result.path);
    println!("Sequence: {}", result.sequence);
    println!("Pages:    {}", result.pages);
    println!("Changes:  {}", result.changes);

    if !result.namespaces.is_empty() {
        println!();
        println!("Namespaces:");
        for ns in &result.namespaces {
            println!(
                "  {}: {} upserts, {} deletes",
                ns.namespace, ns.upserts, ns.deletes
            );
        }
    }
}
