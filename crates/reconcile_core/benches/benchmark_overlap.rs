use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reconcile_core::{overlap, Coordinate, Shape};

fn zigzag(points: usize, lon_offset: f64) -> Shape {
    Shape::from_points(
        (0..points)
            .map(|i| {
                let lat = 60.0 + i as f64 * 0.001;
                let lon = 24.0 + lon_offset + if i % 2 == 0 { 0.0 } else { 0.001 };
                Coordinate::new(lat, lon)
            })
            .collect(),
    )
}

fn benchmark_overlap(c: &mut Criterion) {
    // About 110 km of route each.
    let reference = zigzag(1000, 0.0);
    let tested = zigzag(1000, 0.00005);

    c.bench_function("overlap_1000_pts_tol_30m", |b| {
        b.iter(|| overlap(black_box(&tested), black_box(&reference), 30.0))
    });

    c.bench_function("overlap_1000_pts_tol_100m", |b| {
        b.iter(|| overlap(black_box(&tested), black_box(&reference), 100.0))
    });
}

criterion_group!(benches, benchmark_overlap);
criterion_main!(benches);
