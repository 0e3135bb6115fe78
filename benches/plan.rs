use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use patchgrid::{plan, search_grid, ImageDimensions};
use std::hint::black_box;

// Benchmark layout planning across image shapes
fn bench_image_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_shapes");
    let shapes = [
        (100, 100),
        (1000, 1000),
        (4000, 4000),
        (1200, 800),
        (9000, 100),
    ];

    for (width, height) in shapes {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &(width, height),
            |b, &(width, height)| {
                b.iter(|| plan(black_box(ImageDimensions::new(width, height)), black_box(9)))
            },
        );
    }
    group.finish();
}

// Benchmark the general search across target counts with different divisor
// structures (1, primes, highly composite)
fn bench_target_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_targets");
    let dims = ImageDimensions::new(1920, 1080);

    for target in [1u32, 6, 9, 12, 36, 97, 144] {
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
            b.iter(|| search_grid(black_box(dims), black_box(target)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_image_shapes, bench_target_counts);
criterion_main!(benches);
