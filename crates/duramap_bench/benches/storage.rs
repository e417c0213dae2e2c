//! Storage engine benchmarks.
//!
//! These measure the engines without the map layer on top, as a baseline
//! for the `map` benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use duramap_bench::utils::ENTRIES;
use duramap_storage::{EngineOptions, InMemoryEngine, SledEngine, StorageEngine, WriteBatch};
use tempfile::TempDir;

const BUCKET: &str = "bench";

/// Create deterministic data of given size.
fn pattern_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Fill a bucket with [`ENTRIES`] records of `size` bytes.
fn populate(engine: &dyn StorageEngine, size: usize) {
    let data = pattern_data(size);
    let mut batch = WriteBatch::new();
    for i in 0..ENTRIES {
        batch.put(format!("thing-{i}").into_bytes(), data.clone());
    }
    engine.commit(BUCKET, batch).unwrap();
}

fn open_sled(dir: &TempDir, sync_on_commit: bool) -> SledEngine {
    let options = EngineOptions {
        sync_on_commit,
        ..EngineOptions::default()
    };
    SledEngine::open(&dir.path().join("bench.db"), &options).unwrap()
}

/// Benchmark single-record commits.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    group.sample_size(20); // Synced commits are slow

    for size in [64usize, 256, 1024] {
        let data = pattern_data(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("inmemory", size), &data, |b, data| {
            let engine = InMemoryEngine::new();
            b.iter(|| {
                let mut batch = WriteBatch::new();
                batch.put(b"foo".to_vec(), data.clone());
                engine.commit(BUCKET, black_box(batch)).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("sled_synced", size), &data, |b, data| {
            let dir = TempDir::new().unwrap();
            let engine = open_sled(&dir, true);
            b.iter(|| {
                let mut batch = WriteBatch::new();
                batch.put(b"foo".to_vec(), data.clone());
                engine.commit(BUCKET, black_box(batch)).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("sled_unsynced", size), &data, |b, data| {
            let dir = TempDir::new().unwrap();
            let engine = open_sled(&dir, false);
            b.iter(|| {
                let mut batch = WriteBatch::new();
                batch.put(b"foo".to_vec(), data.clone());
                engine.commit(BUCKET, black_box(batch)).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark full-bucket scans of a 10k-record bucket.
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ENTRIES as u64));

    group.bench_function("inmemory_10k", |b| {
        let engine = InMemoryEngine::new();
        populate(&engine, 256);
        b.iter(|| black_box(engine.scan(BUCKET).unwrap().count()));
    });

    group.bench_function("sled_10k", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_sled(&dir, true);
        populate(&engine, 256);
        b.iter(|| black_box(engine.scan(BUCKET).unwrap().count()));
    });

    group.finish();
}

/// Benchmark resetting a populated bucket.
fn bench_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset_bucket");
    group.sample_size(10);

    group.bench_function("sled_10k", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_sled(&dir, true);
        b.iter(|| {
            populate(&engine, 64);
            engine.reset_bucket(BUCKET).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_commit, bench_scan, bench_reset);

criterion_main!(benches);
