//! Property-based tests for the engine's core invariants.

use proptest::prelude::*;
use triangulated_scattered_interpolation::geometry::predicates::in_circumcircle;
use triangulated_scattered_interpolation::{
    InterpOrder, PlanarTriangulation, Point2, QueryStatus, SpherePoint, Spherical,
};

/// Snap coordinates to a coarse lattice so duplicate and near-degenerate
/// inputs stay representable but rare.
fn snapped_points(n: usize) -> impl Strategy<Value = Vec<Point2>> {
    prop::collection::vec((0i32..200, 0i32..200), n..n * 2).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(x, y)| Point2::new(f64::from(x) * 0.5, f64::from(y) * 0.5))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_triangulation_is_delaunay(points in snapped_points(6)) {
        let Ok(tri) = PlanarTriangulation::from_points(points.clone()) else {
            // Duplicate or collinear draws are legitimately rejected
            return Ok(());
        };
        tri.validate().expect("structural invariants hold");
        for [a, b, c] in tri.simplices() {
            for (v, &p) in points.iter().enumerate() {
                if v == a || v == b || v == c {
                    continue;
                }
                prop_assert!(
                    !in_circumcircle(points[a], points[b], points[c], p),
                    "vertex {} violates cell ({}, {}, {})", v, a, b, c
                );
            }
        }
    }

    #[test]
    fn prop_linear_interpolation_exact_for_affine(
        points in snapped_points(8),
        qx in 5.0..95.0f64,
        qy in 5.0..95.0f64,
        coeffs in (-2.0..2.0f64, -2.0..2.0f64, -5.0..5.0f64),
    ) {
        let Ok(tri) = PlanarTriangulation::from_points(points) else {
            return Ok(());
        };
        let (ax, ay, c) = coeffs;
        let field: Vec<f64> = tri
            .points()
            .iter()
            .map(|p| ax * p.x + ay * p.y + c)
            .collect();
        let q = Point2::new(qx, qy);
        let results = tri
            .interpolate(&field, &[q], InterpOrder::Linear)
            .expect("valid field");
        if results[0].status == QueryStatus::Interpolated {
            let expected = ax * q.x + ay * q.y + c;
            prop_assert!(
                (results[0].value - expected).abs() < 1e-8,
                "got {}, expected {expected}", results[0].value
            );
        }
    }

    #[test]
    fn prop_tangent_cartesian_roundtrip(
        lon in -180.0..180.0f64,
        lat in -89.0..89.0f64,
        ge in -10.0..10.0f64,
        gn in -10.0..10.0f64,
    ) {
        let p = SpherePoint::from_lonlat_degrees(lon, lat);
        let cart = Spherical::tangent_to_cartesian(p, [ge, gn]);
        let back = Spherical::cartesian_to_tangent(p, cart);
        prop_assert!((back[0] - ge).abs() < 1e-9);
        prop_assert!((back[1] - gn).abs() < 1e-9);
    }

    #[test]
    fn prop_statuses_cover_every_query(
        points in snapped_points(6),
        queries in prop::collection::vec((-50.0..150.0f64, -50.0..150.0f64), 1..20),
    ) {
        let Ok(tri) = PlanarTriangulation::from_points(points) else {
            return Ok(());
        };
        let field = vec![1.0; tri.npoints()];
        let qs: Vec<Point2> = queries.iter().map(|&(x, y)| Point2::new(x, y)).collect();
        let results = tri
            .interpolate(&field, &qs, InterpOrder::Linear)
            .expect("valid field");
        prop_assert_eq!(results.len(), qs.len());
        for r in &results {
            // A constant field interpolates and extrapolates to the
            // constant; only invalid points may deviate
            if r.status != QueryStatus::Invalid {
                prop_assert!((r.value - 1.0).abs() < 1e-6);
            } else {
                prop_assert!(r.value.is_nan());
            }
        }
    }
}
