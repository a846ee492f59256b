//! Public triangulation handle.
//!
//! A [`Triangulation`] is built once from input coordinates and immutable
//! afterwards; rebuilding means constructing a fresh instance. The handle
//! owns the nodal-derivative cache and carries a `Uuid` identity so cached
//! artifacts can be tied to the triangulation they were computed against.

use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{InterpError, InterpResult};
use crate::geometry::coords::{Point2, SpherePoint};
use crate::geometry::domain::{Domain, Planar, Spherical};
use crate::interp::gradient::NodalGradients;
use crate::interp::locate::{Location, locate};
use crate::interp::query::{
    DerivativeCache, FieldData, QueryResult, edge_tensions, interpolate_batch,
};
use crate::interp::spline::InterpOrder;
use crate::mesh::arena::MeshArena;
use crate::mesh::builder::{triangulate_planar, triangulate_spherical, validate_order};

/// An immutable triangulated point set with interpolation and gradient
/// queries.
#[derive(Debug)]
pub struct Triangulation<D: Domain> {
    mesh: MeshArena<D>,
    id: Uuid,
    cache: DerivativeCache,
}

/// Planar triangulation handle.
pub type PlanarTriangulation = Triangulation<Planar>;

/// Spherical triangulation handle.
pub type SphericalTriangulation = Triangulation<Spherical>;

impl<D: Domain> Triangulation<D> {
    fn assemble(points: Vec<D::Point>, triples: Vec<[usize; 3]>) -> InterpResult<Self> {
        let mesh = MeshArena::from_cells(points, triples)?;
        log::info!(
            "{} triangulation built: {} vertices, {} cells, {} hull edges",
            D::NAME,
            mesh.npoints(),
            mesh.ncells(),
            mesh.hull().len()
        );
        Ok(Self {
            mesh,
            id: Uuid::new_v4(),
            cache: DerivativeCache::default(),
        })
    }

    /// Unique identity of this triangulation instance.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Number of vertices.
    #[must_use]
    pub const fn npoints(&self) -> usize {
        self.mesh.npoints()
    }

    /// All vertex coordinates, in input order.
    #[must_use]
    pub fn points(&self) -> &[D::Point] {
        self.mesh.points()
    }

    /// Cell vertex triples in counterclockwise order.
    #[must_use]
    pub fn simplices(&self) -> Vec<[usize; 3]> {
        self.mesh.cells().iter().map(|c| c.vertices).collect()
    }

    /// Number of triangle cells.
    #[must_use]
    pub const fn ncells(&self) -> usize {
        self.mesh.ncells()
    }

    /// Ordered (counterclockwise) neighbor vertices around `v`.
    #[must_use]
    pub fn neighbors(&self, v: usize) -> Vec<usize> {
        self.mesh.neighbor_ring(v)
    }

    /// Returns true if `v` lies on the hull boundary (always false on the
    /// sphere).
    #[must_use]
    pub fn is_boundary(&self, v: usize) -> bool {
        self.mesh.is_boundary(v)
    }

    /// Hull boundary edges as vertex pairs, oriented with the mesh
    /// interior to the left. Empty on the sphere.
    #[must_use]
    pub fn hull_edges(&self) -> Vec<(usize, usize)> {
        self.mesh.hull().iter().map(|e| (e.from, e.to)).collect()
    }

    /// Locates a query point.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::NonFiniteQuery`] or
    /// [`InterpError::LocateFailed`]; both are recoverable per point.
    pub fn locate(&self, p: D::Point) -> InterpResult<Location> {
        locate(&self.mesh, p, None)
    }

    /// Cell containing `p`, or `None` when `p` is outside the hull or
    /// cannot be located.
    #[must_use]
    pub fn containing_triangle(&self, p: D::Point) -> Option<usize> {
        match self.locate(p) {
            Ok(Location::Inside { cell }) => Some(cell),
            _ => None,
        }
    }

    /// Checks structural invariants of the underlying mesh.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::DegenerateGeometry`] naming the violated
    /// invariant.
    pub fn validate(&self) -> InterpResult<()> {
        self.mesh.validate()
    }

    /// Nodal gradient estimates for `field`, computed once per field array
    /// and cached.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::FieldLengthMismatch`] if `field` does not
    /// match the vertex count.
    pub fn nodal_gradients(&self, field: &[f64]) -> InterpResult<Arc<NodalGradients>> {
        self.check_field(field)?;
        Ok(self.cache.fetch(&self.mesh, field).gradients)
    }

    /// Interpolates `field` at each query point.
    ///
    /// The result vector is aligned to `queries`; per-point failures are
    /// reported through [`QueryResult::status`], never as an error.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::FieldLengthMismatch`] if `field` does not
    /// match the vertex count.
    pub fn interpolate(
        &self,
        field: &[f64],
        queries: &[D::Point],
        order: InterpOrder,
    ) -> InterpResult<Vec<QueryResult>> {
        self.check_field(field)?;
        let data = match order {
            InterpOrder::CubicTension => Some(self.cache.fetch(&self.mesh, field)),
            InterpOrder::Nearest | InterpOrder::Linear => None,
        };
        Ok(interpolate_batch(
            &self.mesh,
            field,
            data.as_ref(),
            queries,
            order,
        ))
    }

    /// Interpolates with caller-supplied nodal derivatives instead of the
    /// estimated ones. Edge tensions are selected against the supplied
    /// derivatives; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::FieldLengthMismatch`] if `field` or
    /// `gradients` do not match the vertex count.
    pub fn interpolate_with_gradients(
        &self,
        field: &[f64],
        gradients: &NodalGradients,
        queries: &[D::Point],
        order: InterpOrder,
    ) -> InterpResult<Vec<QueryResult>> {
        self.check_field(field)?;
        if gradients.len() != self.npoints() {
            return Err(InterpError::FieldLengthMismatch {
                expected: self.npoints(),
                provided: gradients.len(),
            });
        }
        let data = match order {
            InterpOrder::CubicTension => Some(FieldData {
                tensions: Arc::new(edge_tensions(&self.mesh, field, gradients)),
                gradients: Arc::new(gradients.clone()),
            }),
            InterpOrder::Nearest | InterpOrder::Linear => None,
        };
        Ok(interpolate_batch(
            &self.mesh,
            field,
            data.as_ref(),
            queries,
            order,
        ))
    }

    /// Interpolates `field` at a single query point.
    ///
    /// # Errors
    ///
    /// Unlike the batch call, per-point failures surface here:
    /// [`InterpError::NonFiniteQuery`] and [`InterpError::LocateFailed`]
    /// are returned directly, alongside
    /// [`InterpError::FieldLengthMismatch`] for a bad field array.
    pub fn interpolate_one(
        &self,
        field: &[f64],
        query: D::Point,
        order: InterpOrder,
    ) -> InterpResult<QueryResult> {
        self.check_field(field)?;
        locate(&self.mesh, query, None)?;
        let results = self.interpolate(field, &[query], order)?;
        Ok(results[0])
    }

    fn check_field(&self, field: &[f64]) -> InterpResult<()> {
        if field.len() != self.npoints() {
            return Err(InterpError::FieldLengthMismatch {
                expected: self.npoints(),
                provided: field.len(),
            });
        }
        Ok(())
    }
}

impl Triangulation<Planar> {
    /// Builds a planar Delaunay triangulation from points.
    ///
    /// # Errors
    ///
    /// Returns the degenerate-input family of errors for fewer than three
    /// points, duplicates, or collinear input.
    pub fn from_points(points: Vec<Point2>) -> InterpResult<Self> {
        Self::from_points_with_hint(points, None)
    }

    /// Builds a planar triangulation, optionally inserting points in a
    /// caller-supplied order (a locality-friendly order speeds up
    /// construction; the result is the same triangulation).
    ///
    /// # Errors
    ///
    /// As [`Self::from_points`], plus a degenerate-input error when the
    /// hint is not a permutation of the vertex indices.
    pub fn from_points_with_hint(
        points: Vec<Point2>,
        insertion_order: Option<&[usize]>,
    ) -> InterpResult<Self> {
        if points.len() < 3 {
            return Err(InterpError::InsufficientVertices {
                provided: points.len(),
            });
        }
        let sequence: Vec<usize> = match insertion_order {
            Some(order) => {
                validate_order(points.len(), order)?;
                order.to_vec()
            }
            None => (0..points.len()).collect(),
        };
        let triples = triangulate_planar(&points, &sequence)?;
        Self::assemble(points, triples)
    }

    /// Builds a planar triangulation from `(x, y)` pairs.
    ///
    /// # Errors
    ///
    /// As [`Self::from_points`].
    pub fn from_xy(xy: &[(f64, f64)]) -> InterpResult<Self> {
        Self::from_points(xy.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    /// Estimated gradient component arrays `(d/dx, d/dy)` for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::FieldLengthMismatch`] for a bad field array.
    pub fn gradient_xy(&self, field: &[f64]) -> InterpResult<(Vec<f64>, Vec<f64>)> {
        let grads = self.nodal_gradients(field)?;
        let gx = grads.components().iter().map(|g| g[0]).collect();
        let gy = grads.components().iter().map(|g| g[1]).collect();
        Ok((gx, gy))
    }
}

impl Triangulation<Spherical> {
    /// Builds a spherical Delaunay triangulation from unit-vector points.
    ///
    /// # Errors
    ///
    /// Returns the degenerate-input family of errors for fewer than four
    /// points, duplicates, all points on one great circle, or a point set
    /// that does not span the sphere.
    pub fn from_points(points: Vec<SpherePoint>) -> InterpResult<Self> {
        Self::from_points_with_hint(points, None)
    }

    /// Builds a spherical triangulation with an optional insertion order.
    ///
    /// # Errors
    ///
    /// As [`Self::from_points`], plus a degenerate-input error when the
    /// hint is not a permutation of the vertex indices.
    pub fn from_points_with_hint(
        points: Vec<SpherePoint>,
        insertion_order: Option<&[usize]>,
    ) -> InterpResult<Self> {
        if points.len() < 3 {
            return Err(InterpError::InsufficientVertices {
                provided: points.len(),
            });
        }
        let sequence: Vec<usize> = match insertion_order {
            Some(order) => {
                validate_order(points.len(), order)?;
                order.to_vec()
            }
            None => (0..points.len()).collect(),
        };
        let triples = triangulate_spherical(&points, &sequence)?;
        Self::assemble(points, triples)
    }

    /// Builds a spherical triangulation from arbitrary 3-vectors, which
    /// are normalized onto the unit sphere.
    ///
    /// # Errors
    ///
    /// As [`Self::from_points`], plus a degenerate-input error for a zero
    /// or non-finite vector.
    pub fn from_unit_vectors(vectors: &[[f64; 3]]) -> InterpResult<Self> {
        let mut points = Vec::with_capacity(vectors.len());
        for (v, &[x, y, z]) in vectors.iter().enumerate() {
            let Some(p) = SpherePoint::normalized(x, y, z) else {
                return Err(InterpError::DegenerateGeometry {
                    reason: format!("vector {v} cannot be normalized onto the sphere"),
                });
            };
            points.push(p);
        }
        Self::from_points(points)
    }

    /// Builds a spherical triangulation from `(longitude, latitude)` pairs
    /// in degrees.
    ///
    /// # Errors
    ///
    /// As [`Self::from_points`].
    pub fn from_lonlat_degrees(lonlat: &[(f64, f64)]) -> InterpResult<Self> {
        Self::from_points(
            lonlat
                .iter()
                .map(|&(lon, lat)| SpherePoint::from_lonlat_degrees(lon, lat))
                .collect(),
        )
    }

    /// Builds a spherical triangulation from `(longitude, latitude)` pairs
    /// in radians.
    ///
    /// # Errors
    ///
    /// As [`Self::from_points`].
    pub fn from_lonlat_radians(lonlat: &[(f64, f64)]) -> InterpResult<Self> {
        Self::from_points(
            lonlat
                .iter()
                .map(|&(lon, lat)| SpherePoint::from_lonlat_radians(lon, lat))
                .collect(),
        )
    }

    /// Estimated tangent-plane gradient arrays for `field`.
    ///
    /// The first array is the eastward component (the physical rate along
    /// increasing longitude, already carrying the `1/cos(latitude)`
    /// scaling), the second the northward component.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::FieldLengthMismatch`] for a bad field array.
    pub fn gradient_lonlat(&self, field: &[f64]) -> InterpResult<(Vec<f64>, Vec<f64>)> {
        let grads = self.nodal_gradients(field)?;
        let east = grads.components().iter().map(|g| g[0]).collect();
        let north = grads.components().iter().map(|g| g[1]).collect();
        Ok((east, north))
    }

    /// Estimated gradients for `field` as 3-D Cartesian vectors lying in
    /// each vertex's tangent plane.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::FieldLengthMismatch`] for a bad field array.
    pub fn gradient_xyz(&self, field: &[f64]) -> InterpResult<Vec<[f64; 3]>> {
        let grads = self.nodal_gradients(field)?;
        Ok(self
            .points()
            .iter()
            .zip(grads.components())
            .map(|(&p, &g)| Spherical::tangent_to_cartesian(p, g))
            .collect())
    }

    /// Converts a tangent-plane gradient at vertex `v` to Cartesian form.
    #[must_use]
    pub fn tangent_to_cartesian(&self, v: usize, gradient: [f64; 2]) -> [f64; 3] {
        Spherical::tangent_to_cartesian(self.mesh.point(v), gradient)
    }

    /// Projects a Cartesian gradient at vertex `v` to tangent-plane form.
    #[must_use]
    pub fn cartesian_to_tangent(&self, v: usize, gradient: [f64; 3]) -> [f64; 2] {
        Spherical::cartesian_to_tangent(self.mesh.point(v), gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::query::QueryStatus;
    use approx::assert_relative_eq;

    fn unit_square() -> PlanarTriangulation {
        PlanarTriangulation::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
            .expect("square triangulates")
    }

    #[test]
    fn test_too_few_points() {
        let result = PlanarTriangulation::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(
            result.err(),
            Some(InterpError::InsufficientVertices { provided: 2 })
        );
    }

    #[test]
    fn test_topology_introspection() {
        let tri = unit_square();
        assert_eq!(tri.npoints(), 4);
        assert_eq!(tri.ncells(), 2);
        assert_eq!(tri.simplices().len(), 2);
        assert_eq!(tri.hull_edges().len(), 4);
        assert!(tri.is_boundary(0));
        assert!(tri.validate().is_ok());
        let ring = tri.neighbors(0);
        assert!(ring.contains(&1) && ring.contains(&3), "ring {ring:?}");
    }

    #[test]
    fn test_ids_are_distinct_per_instance() {
        let a = unit_square();
        let b = unit_square();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_containing_triangle() {
        let tri = unit_square();
        assert!(tri.containing_triangle(Point2::new(0.5, 0.25)).is_some());
        assert!(tri.containing_triangle(Point2::new(3.0, 3.0)).is_none());
    }

    #[test]
    fn test_field_length_is_checked() {
        let tri = unit_square();
        let result = tri.interpolate(&[1.0, 2.0], &[Point2::new(0.5, 0.5)], InterpOrder::Linear);
        assert_eq!(
            result.err(),
            Some(InterpError::FieldLengthMismatch {
                expected: 4,
                provided: 2
            })
        );
    }

    #[test]
    fn test_linear_interpolation_of_affine_field() {
        let tri = unit_square();
        let field: Vec<f64> = tri.points().iter().map(|p| 1.0 + 2.0 * p.x - p.y).collect();
        let queries = vec![Point2::new(0.3, 0.4), Point2::new(0.8, 0.1)];
        let results = tri
            .interpolate(&field, &queries, InterpOrder::Linear)
            .expect("field is valid");
        for (r, q) in results.iter().zip(&queries) {
            assert_eq!(r.status, QueryStatus::Interpolated);
            assert_relative_eq!(r.value, 1.0 + 2.0 * q.x - q.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_interpolate_one_rejects_nan() {
        let tri = unit_square();
        let field = vec![0.0; 4];
        let result =
            tri.interpolate_one(&field, Point2::new(f64::NAN, 0.0), InterpOrder::Linear);
        assert_eq!(result.err(), Some(InterpError::NonFiniteQuery));
    }

    #[test]
    fn test_sphere_constructors_agree() {
        let lonlat = [
            (0.0, 10.0),
            (120.0, 15.0),
            (-120.0, 5.0),
            (60.0, -60.0),
            (-60.0, -55.0),
            (180.0, -10.0),
        ];
        let a = SphericalTriangulation::from_lonlat_degrees(&lonlat).expect("triangulates");
        let vectors: Vec<[f64; 3]> = lonlat
            .iter()
            .map(|&(lon, lat)| SpherePoint::from_lonlat_degrees(lon, lat).as_array())
            .collect();
        let b = SphericalTriangulation::from_unit_vectors(&vectors).expect("triangulates");
        assert_eq!(a.ncells(), b.ncells());
        assert!(a.hull_edges().is_empty(), "spheres have no hull");
        assert!(!a.is_boundary(0));
    }

    #[test]
    fn test_gradient_conversion_roundtrip() {
        let tri = SphericalTriangulation::from_lonlat_degrees(&[
            (0.0, 10.0),
            (120.0, 15.0),
            (-120.0, 5.0),
            (60.0, -60.0),
            (-60.0, -55.0),
            (180.0, -10.0),
        ])
        .expect("triangulates");
        let g = [0.75, -1.5];
        let cart = tri.tangent_to_cartesian(2, g);
        let back = tri.cartesian_to_tangent(2, cart);
        assert_relative_eq!(back[0], g[0], epsilon = 1e-12);
        assert_relative_eq!(back[1], g[1], epsilon = 1e-12);
    }

    #[test]
    fn test_insertion_hint_changes_nothing() {
        let points = vec![
            (0.2, 0.1),
            (3.4, 0.3),
            (1.7, 2.9),
            (0.4, 2.2),
            (2.8, 1.4),
            (1.1, 0.9),
        ];
        let plain = PlanarTriangulation::from_xy(&points).expect("triangulates");
        let hinted = PlanarTriangulation::from_points_with_hint(
            points.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            Some(&[5, 3, 1, 0, 4, 2]),
        )
        .expect("triangulates");

        let mut a = plain.simplices();
        let mut b = hinted.simplices();
        let canon = |t: &mut Vec<[usize; 3]>| {
            for s in t.iter_mut() {
                let k = s.iter().enumerate().min_by_key(|&(_, &v)| v).unwrap().0;
                s.rotate_left(k);
            }
            t.sort_unstable();
        };
        canon(&mut a);
        canon(&mut b);
        assert_eq!(a, b, "insertion order must not change the triangulation");
    }

    #[test]
    fn test_bad_insertion_hint_rejected() {
        let result = PlanarTriangulation::from_points_with_hint(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
            Some(&[0, 1, 1]),
        );
        assert!(matches!(
            result,
            Err(InterpError::DegenerateGeometry { .. })
        ));
    }
}
