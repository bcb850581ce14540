//! Grid construction and operator benchmarks.
//!
//! Measures the eager construction pipeline (tessellation, perimeter
//! detection, link derivation, connectivity tables) on seeded random point
//! clouds and hexagonal lattices, plus one flux-divergence evaluation per
//! grid size with a reused workspace.
//!
//! Set `DUALGRID_BENCH_SEED` to benchmark a different random point cloud.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dualgrid::prelude::*;
use std::hint::black_box;

/// Number of points per benchmarked grid
const COUNTS: &[usize] = &[100, 1_000, 10_000];

fn bench_seed() -> u64 {
    if let Ok(value) = std::env::var("DUALGRID_BENCH_SEED")
        && let Ok(seed) = value.parse()
    {
        return seed;
    }
    42
}

fn random_points(count: usize) -> Vec<[f64; 2]> {
    random_points_seeded(count, (0.0, 1_000.0), (0.0, 1_000.0), bench_seed())
        .expect("benchmark point generation failed")
}

fn bench_random_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction/random");
    for &count in COUNTS {
        let points = random_points(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &points, |b, points| {
            b.iter(|| {
                VoronoiDelaunayGrid::from_points(black_box(points), &GridOptions::default())
                    .expect("benchmark grid construction failed")
            });
        });
    }
    group.finish();
}

fn bench_hex_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction/hex");
    for &rows in &[11_usize, 31, 101] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                VoronoiDelaunayGrid::hex(black_box(rows), rows / 2, 1.0, &GridOptions::default())
                    .expect("benchmark grid construction failed")
            });
        });
    }
    group.finish();
}

fn bench_flux_divergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators/flux_div");
    for &count in COUNTS {
        let grid = VoronoiDelaunayGrid::from_points(&random_points(count), &GridOptions::default())
            .expect("benchmark grid construction failed");
        let z: Vec<f64> = grid.xy_of_node().iter().map(|&[x, y]| x.sin() + y).collect();
        let mut grad = vec![0.0; grid.number_of_active_links()];
        calc_grad_at_active_link(&grid, &z, &mut grad).expect("gradient failed");
        let mut div = vec![0.0; grid.number_of_nodes()];
        let mut workspace = DivergenceWorkspace::new();

        group.throughput(Throughput::Elements(grid.number_of_active_links() as u64));
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| {
                workspace
                    .calc_flux_div_at_node(&grid, black_box(&grad), &mut div)
                    .expect("divergence failed");
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_random_construction,
    bench_hex_construction,
    bench_flux_divergence
);
criterion_main!(benches);
