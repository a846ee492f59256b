//! Point-set generators and small numeric helpers.
//!
//! These feed the demo binary, tests, and benchmarks with reproducible
//! planar and spherical point clouds; they are not part of the engine
//! contract.

use rand::{RngExt, SeedableRng, rngs::StdRng};

use crate::geometry::coords::{Point2, SpherePoint};
use crate::geometry::domain::CoordinateScalar;

/// Generates `n` uniformly random planar points over `[0, extent]^2` with
/// a fixed seed for deterministic runs.
#[must_use]
pub fn random_planar_points(n: usize, extent: f64, seed: u64) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point2::new(
                rng.random_range(0.0..extent),
                rng.random_range(0.0..extent),
            )
        })
        .collect()
}

/// Generates a jittered grid of roughly `nx * ny` points with the given
/// spacing, a stand-in for the irregular survey meshes this engine is
/// built for. Jitter is a fraction of the spacing; zero gives a regular
/// grid.
#[must_use]
pub fn jittered_grid(nx: usize, ny: usize, spacing: f64, jitter: f64, seed: u64) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amplitude = spacing * jitter;
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = (i as f64 * spacing, j as f64 * spacing);
            let dx = if amplitude > 0.0 {
                rng.random_range(-amplitude..amplitude)
            } else {
                0.0
            };
            let dy = if amplitude > 0.0 {
                rng.random_range(-amplitude..amplitude)
            } else {
                0.0
            };
            points.push(Point2::new(x + dx, y + dy));
        }
    }
    points
}

/// Generates `n` points on the unit sphere along a Fibonacci lattice,
/// which covers the sphere nearly uniformly for any `n`.
#[must_use]
pub fn fibonacci_sphere(n: usize) -> Vec<SpherePoint> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            #[allow(clippy::cast_precision_loss)]
            let theta = golden_angle * i as f64;
            SpherePoint::normalized(r * theta.cos(), r * theta.sin(), z)
                .expect("lattice points are never zero")
        })
        .collect()
}

/// Generates `n` uniformly random points on the unit sphere with a fixed
/// seed.
#[must_use]
pub fn random_sphere_points(n: usize, seed: u64) -> Vec<SpherePoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let z: f64 = rng.random_range(-1.0..1.0);
            let lon: f64 = rng.random_range(0.0..std::f64::consts::TAU);
            let r = (1.0 - z * z).sqrt();
            SpherePoint::normalized(r * lon.cos(), r * lon.sin(), z)
                .expect("sampled direction is never zero")
        })
        .collect()
}

/// Root-mean-square of a value slice.
///
/// # Panics
///
/// Panics if the element count cannot be represented in `T`.
#[must_use]
pub fn rms<T: CoordinateScalar>(values: &[T]) -> T {
    if values.is_empty() {
        return T::zero();
    }
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v * v);
    let n = T::from(values.len()).expect("element count fits the scalar type");
    (sum / n).sqrt()
}
