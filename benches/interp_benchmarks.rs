//! Benchmarks for the interpolation engine.
//!
//! Measures the cost of the three pipeline stages a caller pays for:
//! - Triangulation construction (planar and spherical)
//! - Batch interpolation at each order
//! - Nodal gradient estimation

#![allow(missing_docs)] // Allow missing docs for criterion-generated functions

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use triangulated_scattered_interpolation::util::{
    fibonacci_sphere, random_planar_points, random_sphere_points,
};
use triangulated_scattered_interpolation::{
    InterpOrder, PlanarTriangulation, SphericalTriangulation,
};

/// Benchmark planar triangulation construction at several sizes
fn bench_planar_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("planar_construction");

    for vertex_count in [50usize, 200, 1000] {
        group.throughput(Throughput::Elements(vertex_count as u64));
        group.bench_with_input(
            BenchmarkId::new("from_points", vertex_count),
            &vertex_count,
            |b, &vertex_count| {
                let points = random_planar_points(vertex_count, 100.0, 5);
                b.iter(|| {
                    let tri = PlanarTriangulation::from_points(black_box(points.clone()));
                    black_box(tri)
                });
            },
        );
    }
    group.finish();
}

/// Benchmark spherical triangulation construction
fn bench_spherical_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("spherical_construction");

    for vertex_count in [50usize, 200, 1000] {
        group.throughput(Throughput::Elements(vertex_count as u64));
        group.bench_with_input(
            BenchmarkId::new("from_points", vertex_count),
            &vertex_count,
            |b, &vertex_count| {
                let points = fibonacci_sphere(vertex_count);
                b.iter(|| {
                    let tri = SphericalTriangulation::from_points(black_box(points.clone()));
                    black_box(tri)
                });
            },
        );
    }
    group.finish();
}

/// Benchmark batch interpolation at each order
fn bench_interpolation_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation");

    let points = random_planar_points(500, 100.0, 5);
    let tri = PlanarTriangulation::from_points(points).expect("bench mesh builds");
    let field: Vec<f64> = tri
        .points()
        .iter()
        .map(|p| (0.05 * p.x).cos() * (0.1 * p.y).sin())
        .collect();
    let queries = random_planar_points(2000, 100.0, 11);

    for order in [
        InterpOrder::Nearest,
        InterpOrder::Linear,
        InterpOrder::CubicTension,
    ] {
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("order", order.selector()),
            &order,
            |b, &order| {
                // Warm the derivative cache so steady-state cost is measured
                let _ = tri.interpolate(&field, &queries[..1], order);
                b.iter(|| {
                    let results = tri.interpolate(
                        black_box(&field),
                        black_box(&queries),
                        black_box(order),
                    );
                    black_box(results)
                });
            },
        );
    }
    group.finish();
}

/// Benchmark gradient estimation on the sphere
fn bench_gradient_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient_estimation");

    for vertex_count in [200usize, 1000] {
        let tri = SphericalTriangulation::from_points(fibonacci_sphere(vertex_count))
            .expect("bench mesh builds");
        let base_field: Vec<f64> = tri.points().iter().map(|p| p.x * p.z).collect();

        group.throughput(Throughput::Elements(vertex_count as u64));
        group.bench_with_input(
            BenchmarkId::new("nodal_gradients", vertex_count),
            &vertex_count,
            |b, _| {
                let mut tweak = 0.0f64;
                b.iter(|| {
                    // Perturb the field each iteration so the per-field
                    // cache cannot short-circuit the work being measured
                    tweak += 1e-9;
                    let field: Vec<f64> = base_field.iter().map(|z| z + tweak).collect();
                    let grads = tri.nodal_gradients(black_box(&field));
                    black_box(grads)
                });
            },
        );
    }
    group.finish();
}

/// Benchmark point location throughput
fn bench_point_location(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_location");

    let tri = SphericalTriangulation::from_points(fibonacci_sphere(1000))
        .expect("bench mesh builds");
    let queries = random_sphere_points(1000, 17);

    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("containing_triangle", |b| {
        b.iter(|| {
            for &q in &queries {
                black_box(tri.containing_triangle(black_box(q)));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_planar_construction,
    bench_spherical_construction,
    bench_interpolation_orders,
    bench_gradient_estimation,
    bench_point_location
);
criterion_main!(benches);
