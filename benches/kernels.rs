//! Benchmarks for the scalar and vectorized kernels.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use laneflow::buffer::{LaneBuffer, Vector3SoA};
use laneflow::kernels::{
    BinaryOp, Kernels, PixelBuffer, PixelFormat, QuadraticBatch, Scalar, Vector,
};
use laneflow::Predicate;

fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.37).sin() * 100.0).collect()
}

fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise");
    for len in [1024, 65_536] {
        let (a, b) = (ramp(len), ramp(len + 1)[1..].to_vec());
        group.throughput(Throughput::Elements(len as u64));
        for op in [BinaryOp::Add, BinaryOp::Div, BinaryOp::Min] {
            group.bench_with_input(
                BenchmarkId::new(format!("scalar/{:?}", op), len),
                &len,
                |bench, _| bench.iter(|| Scalar::binary(op, black_box(&a), black_box(&b))),
            );
            group.bench_with_input(
                BenchmarkId::new(format!("vector/{:?}", op), len),
                &len,
                |bench, _| bench.iter(|| Vector::binary(op, black_box(&a), black_box(&b))),
            );
        }
    }
    group.finish();
}

fn bench_dot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot");
    let n = 100_000;
    let vectors: Vec<[f32; 3]> = ramp(3 * n).chunks_exact(3).map(|v| [v[0], v[1], v[2]]).collect();
    let batch = Vector3SoA::from_aos(&vectors);
    group.throughput(Throughput::Elements(n as u64));
    group.bench_function("scalar", |b| b.iter(|| Scalar::dot(black_box(&batch), black_box(&batch))));
    group.bench_function("vector", |b| b.iter(|| Vector::dot(black_box(&batch), black_box(&batch))));
    group.finish();
}

fn bench_sum_loads(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum_loads");
    let len = 65_536;
    let aligned = LaneBuffer::from_slice(&ramp(len));
    let mut shifted = LaneBuffer::<f32>::zeroed(len + 1);
    shifted[1..].copy_from_slice(&aligned);
    group.throughput(Throughput::Elements(len as u64));
    group.bench_function("vector/unaligned", |b| b.iter(|| Vector::sum(black_box(&shifted[1..]))));
    group.bench_function("vector/aligned", |b| b.iter(|| Vector::sum_aligned(black_box(&aligned))));
    group.finish();
}

fn bench_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("masking");
    let v = ramp(65_536);
    let w = ramp(65_537)[1..].to_vec();
    group.bench_function("scalar/filter_greater", |b| {
        b.iter(|| Scalar::filter_greater(black_box(&v), black_box(&w)))
    });
    group.bench_function("vector/filter_greater", |b| {
        b.iter(|| Vector::filter_greater(black_box(&v), black_box(&w)))
    });
    group.bench_function("vector/compare", |b| {
        b.iter(|| Vector::compare(black_box(&v), black_box(&w), Predicate::Ge))
    });
    group.finish();
}

fn bench_quadratic(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic");
    let coeffs: Vec<[f32; 3]> = (0..65_536)
        .map(|i| [1.0 + (i % 7) as f32, (i % 23) as f32 - 11.0, (i % 5) as f32 - 2.0])
        .collect();
    let (batch, _) = QuadraticBatch::from_triples(&coeffs).padded();
    group.bench_function("scalar", |b| b.iter(|| Scalar::solve_quadratic(black_box(&batch))));
    group.bench_function("vector", |b| b.iter(|| Vector::solve_quadratic(black_box(&batch))));
    group.finish();
}

fn bench_pixels(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixels");
    let image = PixelBuffer::gradient(1920, 1080, PixelFormat::Rgb);
    group.throughput(Throughput::Bytes(image.data().len() as u64));

    let mut work = image.clone();
    group.bench_function("scalar/brightness", |b| {
        b.iter(|| Scalar::brightness(work.data_mut(), black_box(50)))
    });
    group.bench_function("vector/brightness", |b| {
        b.iter(|| Vector::brightness(work.data_mut(), black_box(50)))
    });
    group.bench_function("scalar/contrast", |b| {
        b.iter(|| Scalar::contrast(work.data_mut(), black_box(1.5)))
    });
    group.bench_function("vector/contrast", |b| {
        b.iter(|| Vector::contrast(work.data_mut(), black_box(1.5)))
    });
    group.bench_function("scalar/grayscale", |b| b.iter(|| Scalar::grayscale(black_box(&image))));
    group.bench_function("vector/grayscale", |b| b.iter(|| Vector::grayscale(black_box(&image))));
    group.finish();
}

criterion_group!(
    benches,
    bench_elementwise,
    bench_dot,
    bench_sum_loads,
    bench_masking,
    bench_quadratic,
    bench_pixels
);
criterion_main!(benches);
