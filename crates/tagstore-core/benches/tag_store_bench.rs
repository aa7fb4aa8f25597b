//! # Tag Store Benchmarks
//!
//! Put and get throughput over the redb cache.
//!
//! Run with: `cargo bench -p tagstore-core`

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use tagstore_core::{
    BackendManager, Digest, MemBackend, RedbFileStore, RedbTaskQueue, Store, TagStore,
};
use tempfile::TempDir;

/// A store over a temporary redb cache and an in-memory backend.
fn create_store() -> (TagStore, Arc<MemBackend>, TempDir) {
    let temp = tempfile::tempdir().expect("temp dir");
    let fs = Arc::new(RedbFileStore::open(temp.path().join("cache.redb")).expect("cache"));
    let queue = Arc::new(RedbTaskQueue::in_memory().expect("queue"));
    let backend = Arc::new(MemBackend::new());
    let mut manager = BackendManager::new();
    manager.register(".*", backend.clone()).expect("register");
    (TagStore::new(fs, Arc::new(manager), queue), backend, temp)
}

fn tag(i: usize) -> String {
    format!("library/app:{i}")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                create_store,
                |(store, backend, temp)| {
                    for i in 0..size {
                        let t = tag(i);
                        store
                            .put(&t, &Digest::of(t.as_bytes()), Duration::from_secs(30))
                            .expect("put");
                    }
                    (store, backend, temp)
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

fn bench_get_cached(c: &mut Criterion) {
    let (store, _backend, _temp) = create_store();
    for i in 0..1000 {
        let t = tag(i);
        store
            .put(&t, &Digest::of(t.as_bytes()), Duration::from_secs(30))
            .expect("put");
    }

    c.bench_function("get_cached", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % 1000;
            black_box(store.get(&tag(i)).expect("get"))
        });
    });
}

fn bench_get_cold(c: &mut Criterion) {
    c.bench_function("get_backend_fallback", |b| {
        b.iter_batched(
            || {
                let (store, backend, temp) = create_store();
                let d = Digest::of(b"remote");
                backend.insert("remote", d.to_string().into_bytes());
                (store, temp)
            },
            |(store, temp)| {
                black_box(store.get("remote").expect("get"));
                (store, temp)
            },
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, bench_put, bench_get_cached, bench_get_cold);
criterion_main!(benches);
