//! Key mapping benchmarks for treasure-keymap

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use treasure_chest::prelude::*;

fn parse_cached_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mapper = VersionedKeyMapper::new(Arc::new(InMemoryCache::new()));

    // Warm the local version index
    rt.block_on(async {
        mapper
            .parse("catalogue:shirts:product:title")
            .await
            .unwrap();
    });

    let mut group = c.benchmark_group("parse_cached");
    group.throughput(Throughput::Elements(1));

    group.bench_function("plain_key", |b| {
        b.to_async(&rt).iter(|| async {
            let mapped = mapper.parse("greeting").await.unwrap();
            black_box(mapped)
        });
    });

    group.bench_function("three_namespaces", |b| {
        b.to_async(&rt).iter(|| async {
            let mapped = mapper
                .parse("catalogue:shirts:product:title")
                .await
                .unwrap();
            black_box(mapped)
        });
    });

    group.finish();
}

fn parse_cold_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mapper = VersionedKeyMapper::new(Arc::new(InMemoryCache::new()));

    let mut group = c.benchmark_group("parse_cold");

    for depth in [1usize, 3, 6] {
        let key = (0..depth)
            .map(|level| format!("ns{level}"))
            .chain(std::iter::once("leaf".to_string()))
            .collect::<Vec<_>>()
            .join(":");

        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &key, |b, key| {
            b.to_async(&rt).iter(|| async {
                // Invalidation wipes the whole index, so every level is re-read
                mapper.invalidate("ns0").await.unwrap();
                let mapped = mapper.parse(key).await.unwrap();
                black_box(mapped)
            });
        });
    }

    group.finish();
}

fn facade_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = NamespacedCache::with_config(
        Arc::new(InMemoryCache::new()),
        ChestConfig::new().with_prefix("bench"),
    );

    rt.block_on(async {
        cache.store("user:1:name", "Bilbo", None).await.unwrap();
    });

    let mut group = c.benchmark_group("facade");
    group.throughput(Throughput::Elements(1));

    group.bench_function("fetch_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let value = cache.fetch("user:1:name").await.unwrap();
            black_box(value)
        });
    });

    group.bench_function("call_exists", |b| {
        b.to_async(&rt).iter(|| async {
            let outcome = cache
                .call("exists", CallArgs::key("user:1:name"))
                .await
                .unwrap();
            black_box(outcome)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    parse_cached_benchmark,
    parse_cold_benchmark,
    facade_benchmark,
);
criterion_main!(benches);
