#![allow(clippy::multiple_crate_versions)]
#![warn(missing_docs)]

//! Tension-spline interpolation on triangulated scattered data.
//!
//! This library builds Delaunay triangulations of scattered point sets in
//! the Euclidean plane or on the unit sphere, and interpolates scalar
//! fields given at the vertices anywhere on the surface:
//!
//! - Incremental Delaunay construction with walk-based point location
//! - Nearest-neighbor, piecewise-linear, and cubic-with-tension
//!   interpolation, selected by the classic 0/1/3 order
//! - Nodal gradient estimation (Cartesian or lon/lat tangent-plane form)
//!   with per-field caching
//! - Per-query status classification: interpolated, extrapolated beyond
//!   the hull, or invalid — batches never abort on one bad point
//!
//! # Example
//!
//! ```
//! use triangulated_scattered_interpolation::{
//!     InterpOrder, PlanarTriangulation, Point2, QueryStatus,
//! };
//!
//! let tri = PlanarTriangulation::from_xy(&[
//!     (0.0, 0.0),
//!     (1.0, 0.0),
//!     (1.0, 1.0),
//!     (0.0, 1.0),
//! ])
//! .unwrap();
//! let field = vec![0.0, 1.0, 2.0, 1.0];
//! let results = tri
//!     .interpolate(&field, &[Point2::new(0.5, 0.5)], InterpOrder::Linear)
//!     .unwrap();
//! assert_eq!(results[0].status, QueryStatus::Interpolated);
//! ```

use std::time::Instant;

use serde::Serialize;

/// Error types for the interpolation engine.
pub mod errors;

/// Point-set generators and numeric helpers.
pub mod util;

/// Command-line configuration for the demo binary.
pub mod config;

/// Geometry primitives shared by both embeddings.
pub mod geometry {
    /// Planar and spherical coordinate types.
    pub mod coords;
    /// Domain seam: the planar/spherical operation set.
    pub mod domain;
    /// Orientation, in-circle, and barycentric predicates.
    pub mod predicates;
}

/// Triangulated mesh data structures and construction.
pub mod mesh {
    /// Index-based vertex/triangle arena with adjacency.
    pub mod arena;
    /// Incremental Delaunay construction.
    pub(crate) mod builder;
    /// Public triangulation handle.
    pub mod triangulation;
}

/// Interpolation, gradients, and point location.
pub mod interp {
    /// Nodal gradient estimation.
    pub mod gradient;
    /// Walk-based point location.
    pub mod locate;
    /// Batch queries and status classification.
    pub mod query;
    /// Tension splines and the triangular interpolant.
    pub mod spline;
}

// Re-exports for convenience
pub use config::{DomainKind, InterpConfig, TestConfig};
pub use errors::{InterpError, InterpResult};
pub use geometry::coords::{Point2, SpherePoint};
pub use geometry::domain::{Domain, Planar, Spherical};
pub use interp::gradient::NodalGradients;
pub use interp::locate::Location;
pub use interp::query::{QueryResult, QueryStatus};
pub use interp::spline::{InterpOrder, TensionHermite};
pub use mesh::triangulation::{PlanarTriangulation, SphericalTriangulation, Triangulation};

/// Summary of one demo interpolation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Vertices in the generated mesh
    pub vertices: usize,
    /// Triangle cells in the generated mesh
    pub cells: usize,
    /// Queries answered by interpolation
    pub interpolated: usize,
    /// Queries answered by extrapolation beyond the hull
    pub extrapolated: usize,
    /// Queries with no producible value
    pub invalid: usize,
    /// Queries degraded from order 3 to order 1
    pub degraded: usize,
    /// RMS error of the produced values against the analytic test field
    pub rms_error: f64,
    /// Vertices with unreliable gradient estimates (gradient runs only)
    pub unreliable_gradients: Option<usize>,
    /// Wall-clock milliseconds for the query batch
    pub elapsed_ms: u128,
}

/// Runs one demo interpolation batch described by `config`.
///
/// Generates a seeded point set on the configured surface, samples an
/// analytic field at the vertices, interpolates it at random query points,
/// and reports per-status counts plus the RMS error against the analytic
/// values.
///
/// # Errors
///
/// Returns construction errors from the triangulation build and
/// [`InterpError::FieldLengthMismatch`] if an internal field array is
/// malformed (which would be a bug, not an input problem).
pub fn run(config: &InterpConfig) -> InterpResult<RunSummary> {
    let order = config
        .interp_order()
        .unwrap_or(InterpOrder::CubicTension);
    log::info!(
        "domain: {:?}, vertices: {}, queries: {}, order: {order}",
        config.domain,
        config.vertices,
        config.queries
    );

    match config.domain {
        DomainKind::Planar => run_planar(config, order),
        DomainKind::Spherical => run_spherical(config, order),
    }
}

fn run_planar(config: &InterpConfig, order: InterpOrder) -> InterpResult<RunSummary> {
    let analytic = |p: Point2| (0.1 * p.x).cos() * p.y.sin();

    let points = util::random_planar_points(config.vertices as usize, config.extent, config.seed);
    let tri = PlanarTriangulation::from_points(points)?;
    let field: Vec<f64> = tri.points().iter().map(|&p| analytic(p)).collect();

    // Query slightly beyond the extent so extrapolation is exercised
    let margin = 0.05 * config.extent;
    let queries: Vec<Point2> = util::random_planar_points(
        config.queries as usize,
        config.extent + 2.0 * margin,
        config.seed.wrapping_add(1),
    )
    .into_iter()
    .map(|p| Point2::new(p.x - margin, p.y - margin))
    .collect();

    let start = Instant::now();
    let results = tri.interpolate(&field, &queries, order)?;
    let elapsed = start.elapsed();

    let unreliable = if config.gradients {
        let grads = tri.nodal_gradients(&field)?;
        Some(grads.unreliable_count())
    } else {
        None
    };

    Ok(summarize(
        &tri.simplices(),
        tri.npoints(),
        &results,
        &queries.iter().map(|&p| analytic(p)).collect::<Vec<_>>(),
        unreliable,
        elapsed.as_millis(),
    ))
}

fn run_spherical(config: &InterpConfig, order: InterpOrder) -> InterpResult<RunSummary> {
    let analytic = |p: SpherePoint| {
        let (lon, lat) = p.to_lonlat_radians();
        (2.0 * lon).cos() * (3.0 * lat).sin()
    };

    let points = util::fibonacci_sphere(config.vertices as usize);
    let tri = SphericalTriangulation::from_points(points)?;
    let field: Vec<f64> = tri.points().iter().map(|&p| analytic(p)).collect();

    let queries = util::random_sphere_points(config.queries as usize, config.seed.wrapping_add(1));

    let start = Instant::now();
    let results = tri.interpolate(&field, &queries, order)?;
    let elapsed = start.elapsed();

    let unreliable = if config.gradients {
        let grads = tri.nodal_gradients(&field)?;
        Some(grads.unreliable_count())
    } else {
        None
    };

    Ok(summarize(
        &tri.simplices(),
        tri.npoints(),
        &results,
        &queries.iter().map(|&p| analytic(p)).collect::<Vec<_>>(),
        unreliable,
        elapsed.as_millis(),
    ))
}

fn summarize(
    simplices: &[[usize; 3]],
    vertices: usize,
    results: &[QueryResult],
    analytic: &[f64],
    unreliable_gradients: Option<usize>,
    elapsed_ms: u128,
) -> RunSummary {
    let mut interpolated = 0;
    let mut extrapolated = 0;
    let mut invalid = 0;
    let mut degraded = 0;
    let mut errors = Vec::new();
    for (r, &truth) in results.iter().zip(analytic) {
        match r.status {
            QueryStatus::Interpolated => {
                interpolated += 1;
                errors.push(r.value - truth);
            }
            QueryStatus::Extrapolated => extrapolated += 1,
            QueryStatus::Invalid => invalid += 1,
        }
        if r.degraded_order {
            degraded += 1;
        }
    }

    let summary = RunSummary {
        vertices,
        cells: simplices.len(),
        interpolated,
        extrapolated,
        invalid,
        degraded,
        rms_error: util::rms(&errors),
        unreliable_gradients,
        elapsed_ms,
    };
    log::info!(
        "queries: {} interpolated, {} extrapolated, {} invalid, {} degraded; rms error {:.3e}",
        summary.interpolated,
        summary.extrapolated,
        summary.invalid,
        summary.degraded,
        summary.rms_error
    );
    summary
}
