//! Cursor evaluation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lowladb_bench::populated_collection;
use lowladb_core::{Filter, SortDirection};
use serde_json::json;

/// Benchmark full sorted scans.
fn bench_sorted_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_scan");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (_lowla, coll) = populated_collection(count).unwrap();
            let cursor = coll.find_all().sort("score");

            b.iter(|| {
                let docs = cursor.to_array().unwrap();
                black_box(docs);
            });
        });
    }
    group.finish();
}

/// Benchmark sort + limit (top-N).
fn bench_sort_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_limit");

    for count in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (_lowla, coll) = populated_collection(count).unwrap();
            let cursor = coll
                .find_all()
                .sort(("score", SortDirection::Descending))
                .limit(10);

            b.iter(|| {
                let docs = cursor.to_array().unwrap();
                black_box(docs);
            });
        });
    }
    group.finish();
}

/// Benchmark filtered counts.
fn bench_filtered_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_count");

    for count in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (_lowla, coll) = populated_collection(count).unwrap();
            let mut filter = Filter::new();
            filter.insert("score".into(), json!({"$gte": 5_000}));
            let cursor = coll.find(filter);

            b.iter(|| {
                black_box(cursor.count(false).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sorted_scan,
    bench_sort_limit,
    bench_filtered_count,
);

criterion_main!(benches);
