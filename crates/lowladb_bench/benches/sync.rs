//! Sync batch benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lowladb_bench::sync_batch;
use lowladb_core::Lowla;
use lowladb_sync::{MockTransport, SyncBatch, SyncEngine};

/// Benchmark decoding without applying.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_decode");

    for pages in [1, 10, 50].iter() {
        group.throughput(Throughput::Elements((*pages * 100) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), pages, |b, &pages| {
            let text = sync_batch(1, pages, 100).to_json();

            b.iter(|| {
                let batch = SyncBatch::from_json(black_box(&text)).unwrap();
                black_box(batch.decode().unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark loading a multi-page batch, replacing the same documents each
/// iteration.
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_load");

    for pages in [1, 10, 50].iter() {
        group.throughput(Throughput::Elements((*pages * 100) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), pages, |b, &pages| {
            let engine = SyncEngine::new(Lowla::in_memory(), MockTransport::new());
            let batch = sync_batch(1, pages, 100);

            b.iter(|| {
                let outcome = engine.load(batch.clone()).unwrap();
                black_box(outcome);
            });
        });
    }
    group.finish();
}

/// Benchmark loading with a live query attached to the synced namespace.
fn bench_load_with_live_query(c: &mut Criterion) {
    let lowla = Lowla::in_memory();
    let engine = SyncEngine::new(lowla.clone(), MockTransport::new());
    let batch = sync_batch(1, 10, 100);
    let _live = lowla
        .collection("bench", "synced")
        .unwrap()
        .find_all()
        .limit(20)
        .on(|cursor| {
            black_box(cursor.to_array().ok());
        })
        .unwrap();

    c.bench_function("batch_load_live", |b| {
        b.iter(|| {
            black_box(engine.load(batch.clone()).unwrap());
        });
    });
    lowla.close();
}

criterion_group!(benches, bench_decode, bench_load, bench_load_with_live_query);

criterion_main!(benches);
