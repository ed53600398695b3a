//! Benchmarks for contour extraction and joining on tile-sized grids.
//!
//! ```bash
//! cargo bench -p topoline-contour
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use topoline_contour::{contour, join, ElevationGrid};

/// Smooth synthetic terrain: a few overlapping hills.
fn terrain(size: usize) -> ElevationGrid {
    let s = size as f64;
    ElevationGrid::from_fn(size, size, |x, y| {
        let (fx, fy) = (x as f64 / s, y as f64 / s);
        1200.0 * (fx * 9.0).sin() * (fy * 7.0).cos() + 800.0 * ((fx - 0.3).powi(2) + (fy - 0.6).powi(2)).sqrt()
    })
    .expect("non-empty grid")
}

fn bench_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("contour_segments");
    for size in [65usize, 129, 257] {
        let grid = terrain(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| contour::segments(black_box(grid), black_box(250.0)))
        });
    }
    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let grid = terrain(257);
    let segments = contour::segments(&grid, 250.0);
    c.bench_function("join_segments_257", |b| {
        b.iter(|| join::join_segments(black_box(&segments)))
    });
}

criterion_group!(benches, bench_segments, bench_join);
criterion_main!(benches);
