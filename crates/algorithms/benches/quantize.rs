//! Benchmarks for quantization and pixel classification

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use pft_algorithms::classification::{
    Classifier, ClusterStatistics, Kmeans, KmeansParams, MiniBatchKmeans, Normalizer, VectorQuantizer,
};
use pft_core::{FeatureCube, Mask, Sample};

const DIM: usize = 16;

fn create_test_vectors(n: usize) -> Array2<f64> {
    // Deterministic pseudo-random vectors around a few centers
    Array2::from_shape_fn((n, DIM), |(i, j)| {
        let center = ((i % 7) * 3) as f64;
        let jitter = ((i * 31 + j * 17) % 101) as f64 / 101.0;
        center + jitter + j as f64 * 0.1
    })
}

fn params(k: usize) -> KmeansParams {
    KmeansParams {
        k,
        max_iterations: 20,
        ..Default::default()
    }
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize/kmeans");
    group.sample_size(10);
    let data = create_test_vectors(20_000);
    for k in [16, 64] {
        let kmeans = Kmeans::new(params(k));
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, _| {
            b.iter(|| kmeans.fit(black_box(data.view())).unwrap())
        });
    }
    group.finish();
}

fn bench_minibatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize/minibatch");
    group.sample_size(10);
    let data = create_test_vectors(20_000);
    for k in [16, 64, 256] {
        let kmeans = MiniBatchKmeans::new(params(k));
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, _| {
            b.iter(|| kmeans.fit(black_box(data.view())).unwrap())
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify/sample");
    let train = create_test_vectors(5_000);
    let normalizer = Normalizer::fit(train.view()).unwrap();
    let normalized = normalizer.transform_batch(train.view()).unwrap();
    let fit = MiniBatchKmeans::new(params(64)).fit(normalized.view()).unwrap();
    let stats = ClusterStatistics::compute(&fit.codebook, normalized.view(), &fit.assignment).unwrap();
    let classifier = Classifier::new(&normalizer, &fit.codebook, &stats);

    for size in [128, 256, 512] {
        let raw = create_test_vectors(size * size);
        let features = FeatureCube::from_vec(raw.into_raw_vec_and_offset().0, size, size, DIM).unwrap();
        let sample = Sample::new("bench", features, Mask::filled(size, size, true));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| classifier.classify(black_box(&sample)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kmeans, bench_minibatch, bench_classify);
criterion_main!(benches);
