//! Benchmarks comparing the pooled pipeline against the sequential one

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parabench::prelude::*;

fn bench_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum");
    group.sample_size(20);

    for size in [10_000u64, 100_000, 1_000_000].iter() {
        let batch = vec![TaskSpec::Sum { size: *size }; 16];

        group.bench_with_input(BenchmarkId::new("sequential", size), &batch, |b, batch| {
            b.iter(|| SequentialPipeline::new().run(black_box(batch)).unwrap())
        });

        for workers in [2usize, 4] {
            let pipeline = PooledPipeline::with_workers(workers).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("parallel_{workers}"), size),
                &batch,
                |b, batch| b.iter(|| pipeline.run(black_box(batch)).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi");
    group.sample_size(20);

    for size in [10_000u64, 1_000_000].iter() {
        let batch = vec![TaskSpec::Multiply { size: *size }; 16];

        group.bench_with_input(BenchmarkId::new("sequential", size), &batch, |b, batch| {
            b.iter(|| SequentialPipeline::new().run(black_box(batch)).unwrap())
        });

        let pipeline = PooledPipeline::with_workers(4).unwrap();
        group.bench_with_input(BenchmarkId::new("parallel_4", size), &batch, |b, batch| {
            b.iter(|| pipeline.run(black_box(batch)).unwrap())
        });
    }

    group.finish();
}

fn bench_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix");
    group.sample_size(10);

    for size in [32usize, 128].iter() {
        let batch = vec![TaskSpec::MatrixInvert { size: *size, seed: 7 }; 8];

        group.bench_with_input(BenchmarkId::new("sequential", size), &batch, |b, batch| {
            b.iter(|| SequentialPipeline::new().run(black_box(batch)).unwrap())
        });

        let pipeline = PooledPipeline::with_workers(4).unwrap();
        group.bench_with_input(BenchmarkId::new("parallel_4", size), &batch, |b, batch| {
            b.iter(|| pipeline.run(black_box(batch)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sum, bench_multiply, bench_matrix);
criterion_main!(benches);
