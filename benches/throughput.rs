//! Throughput Benchmark for EmberKV
//!
//! Measures the cache engine under steady write, read, and mixed
//! workloads, plus the raw progressive map in its resize-heavy regime.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use emberkv::storage::{CacheEngine, ProgressiveMap};

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut engine = CacheEngine::new();
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Bytes::from("small_value"));
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut engine = CacheEngine::new();
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone());
            i += 1;
        });
    });

    group.bench_function("set_overwrite", |b| {
        let mut engine = CacheEngine::new();
        for i in 0..10_000 {
            engine.set(Bytes::from(format!("key:{}", i)), Bytes::from("v"));
        }
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 10_000));
            engine.set(key, Bytes::from("updated"));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let mut engine = CacheEngine::new();

    // Pre-populate with data
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark a mixed workload with evictions
fn bench_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_get_evict", |b| {
        let mut engine = CacheEngine::new();
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 4096));
            match i % 8 {
                0..=2 => engine.set(key, Bytes::from("value")),
                3..=6 => {
                    black_box(engine.get(&key));
                }
                _ => {
                    black_box(engine.evict_lru());
                }
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark the progressive map through its grow/shrink churn
fn bench_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("progressive_map");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert_churn", |b| {
        let mut map: ProgressiveMap<u64, u64> = ProgressiveMap::new();
        let mut i = 0u64;
        b.iter(|| {
            map.set(i, i);
            // Keep roughly 8K keys live so resizes keep firing.
            if i >= 8192 {
                map.del(&(i - 8192));
            }
            i += 1;
        });
    });

    group.bench_function("lookup_during_resize", |b| {
        let mut map: ProgressiveMap<u64, u64> = ProgressiveMap::new();
        for i in 0..100_000 {
            map.set(i, i);
        }
        let mut i = 0u64;
        b.iter(|| {
            black_box(map.lookup(&(i % 100_000)));
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_mixed, bench_map);
criterion_main!(benches);
