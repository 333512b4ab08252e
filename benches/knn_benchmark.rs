//! Benchmarks for the a2a-knn library.

use a2a_knn::batching::Batch;
use a2a_knn::brute_force::TopKSelector;
use a2a_knn::distance_measures::BatchDistanceComputer;
use a2a_knn::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

fn generate_corpus(n: usize, dim: usize, seed: u64) -> Corpus {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let data: Vec<f32> = (0..n * dim).map(|_| rng.gen::<f32>()).collect();
    Corpus::from_flat(&data, dim).unwrap()
}

fn benchmark_all_to_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_to_all");
    group.sample_size(10);

    for &n in &[1000, 4000] {
        let config = KnnConfig::new().with_batch_size(256);
        let knn = BruteForceKnn::new(generate_corpus(n, 64, 42), config.clone()).unwrap();
        group.bench_with_input(BenchmarkId::new("parallel_k10", n), &n, |b, _| {
            b.iter(|| black_box(knn.all_to_all(10).unwrap()))
        });

        let knn = BruteForceKnn::new(generate_corpus(n, 64, 42), config.sequential()).unwrap();
        group.bench_with_input(BenchmarkId::new("sequential_k10", n), &n, |b, _| {
            b.iter(|| black_box(knn.all_to_all(10).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size");
    group.sample_size(10);
    let corpus = std::sync::Arc::new(generate_corpus(2000, 64, 7));

    for &batch_size in &[16, 128, 1024] {
        let config = KnnConfig::new().with_batch_size(batch_size);
        let knn = BruteForceKnn::with_shared_corpus(corpus.clone(), config).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, _| {
            b.iter(|| black_box(knn.all_to_all(10).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_batch_distances(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_distances");

    for &dim in &[32, 128] {
        let corpus = generate_corpus(5000, dim, 3);
        let computer = BatchDistanceComputer::self_join(&corpus);
        let batch = Batch::new(0, 128).unwrap();
        group.bench_with_input(BenchmarkId::new("128x5000", dim), &dim, |b, _| {
            b.iter(|| black_box(computer.compute(batch).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let row: Vec<f32> = (0..100_000).map(|_| rng.gen::<f32>()).collect();

    for strategy in [SelectionStrategy::Partition, SelectionStrategy::Heap] {
        for &k in &[10, 100] {
            let mut selector = TopKSelector::new(k, strategy);
            let mut out = vec![0; k];
            let name = format!("{strategy:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, k), &k, |b, _| {
                b.iter(|| black_box(selector.select(&row, Some(0), &mut out, None)))
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_all_to_all,
    benchmark_batch_sizes,
    benchmark_batch_distances,
    benchmark_selection,
);
criterion_main!(benches);
