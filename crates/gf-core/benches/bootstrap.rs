//! Criterion benchmarks for the request hotpaths in `gf-core`.
//!
//! Benchmarks bootstrap prediction at several iteration counts and corpus
//! sizes, plus the extrapolation guard and similarity search that run on
//! every request.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gf_config::IntervalKind;
use gf_core::test_utils::synthetic_engine;
use gf_core::{BootstrapOptions, CancellationToken, QueryVector};

fn query() -> QueryVector {
    QueryVector::from_array([62.0, 48.0, 71.0, 35.0]).unwrap()
}

fn bench_predict_iterations(c: &mut Criterion) {
    let engine = synthetic_engine(34, 2024);
    let token = CancellationToken::new();
    let q = query();

    let mut group = c.benchmark_group("bootstrap/iterations");
    group.sample_size(20);
    for iterations in [100usize, 1_000, 5_000] {
        let options = BootstrapOptions::default()
            .with_iterations(iterations)
            .with_seed(7);
        group.bench_with_input(BenchmarkId::new("confidence", iterations), &options, |b, opts| {
            b.iter(|| {
                let r = engine.predict(black_box(&q), opts, &token).unwrap();
                black_box(r.data.point_estimate);
            })
        });
    }

    let options = BootstrapOptions::default()
        .with_iterations(1_000)
        .with_interval(IntervalKind::Prediction)
        .with_seed(7);
    group.bench_function("prediction/1000", |b| {
        b.iter(|| black_box(engine.predict(black_box(&q), &options, &token).unwrap()))
    });
    group.finish();
}

fn bench_predict_corpus_size(c: &mut Criterion) {
    let token = CancellationToken::new();
    let q = query();
    let options = BootstrapOptions::default().with_iterations(500).with_seed(3);

    let mut group = c.benchmark_group("bootstrap/corpus");
    group.sample_size(20);
    for n in [20usize, 100, 500] {
        let engine = synthetic_engine(n, 11);
        group.bench_with_input(BenchmarkId::new("members", n), &engine, |b, engine| {
            b.iter(|| black_box(engine.predict(black_box(&q), &options, &token).unwrap()))
        });
    }
    group.finish();
}

fn bench_guard_and_similarity(c: &mut Criterion) {
    let engine = synthetic_engine(500, 5);
    let snapshot = engine.store().load().unwrap();
    let stats = snapshot.statistics().unwrap();
    let z = stats.converter.standardize(&query());
    let q = query();

    let mut group = c.benchmark_group("request");
    group.bench_function("guard_assess/500", |b| {
        b.iter(|| black_box(stats.guard.assess(black_box(&z)).severity))
    });
    group.bench_function("find_similar/500", |b| {
        b.iter(|| black_box(engine.find_similar(black_box(&q), Some(5)).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_predict_iterations,
    bench_predict_corpus_size,
    bench_guard_and_similarity
);
criterion_main!(benches);
