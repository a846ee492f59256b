//! Incremental Delaunay construction.
//!
//! Points are inserted one at a time into a running triangulation: the
//! containing cell is found by an edge walk, split 1-to-3 (or 2-to-4 when
//! the point lands on an edge), and circle-test-driven edge flips restore
//! the local Delaunay property outward from the insertion site.
//!
//! The planar build runs inside an enclosing super-triangle that is
//! stripped afterwards. The spherical build projects all points but one
//! stereographically from that pivot point, triangulates the projection in
//! the plane, maps the result back (reversing orientation), fans the pivot
//! across the planar hull, and legalizes the fan — which is exactly the
//! incremental insertion of the pivot as the final point.

use std::collections::HashSet;

use crate::errors::{InterpError, InterpResult};
use crate::geometry::coords::{Point2, SpherePoint};
use crate::geometry::domain::{Domain, Planar, Spherical};
use crate::mesh::arena::{TriangleCell, link_neighbors};

/// Super-triangle margin as a multiple of the bounding-box extent.
const SUPER_MARGIN: f64 = 1024.0;

/// Relative tolerance for treating a located point as lying on an edge.
const ON_EDGE_REL: f64 = 1e-12;

/// Where an inserted point landed.
enum BuildLocation {
    /// Strictly inside cell
    Inside(usize),
    /// On the edge opposite local vertex `k` of the cell
    OnEdge(usize, usize),
}

/// Mutable triangulation state during construction.
struct DelaunayBuilder<D: Domain> {
    points: Vec<D::Point>,
    cells: Vec<TriangleCell>,
    /// Cells whose edge opposite the freshly inserted vertex awaits a
    /// circle test
    suspect: Vec<usize>,
}

impl<D: Domain> DelaunayBuilder<D> {
    fn corners(&self, t: usize) -> [D::Point; 3] {
        let [a, b, c] = self.cells[t].vertices;
        [self.points[a], self.points[b], self.points[c]]
    }

    /// Walks from `hint` to the cell containing `p`.
    fn locate(&self, p: D::Point, hint: usize) -> InterpResult<BuildLocation> {
        let mut t = hint.min(self.cells.len() - 1);
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(t) {
                return Err(InterpError::DegenerateGeometry {
                    reason: format!(
                        "point location cycled after {} cells during construction",
                        visited.len()
                    ),
                });
            }
            let [a, b, c] = self.corners(t);
            let orients = [
                D::orient(b, c, p),
                D::orient(c, a, p),
                D::orient(a, b, p),
            ];
            let scale = orients.iter().fold(f64::MIN_POSITIVE, |m, o| m.max(o.abs()));
            let eps = ON_EDGE_REL * scale;

            let (worst, &min_o) = orients
                .iter()
                .enumerate()
                .min_by(|(_, x), (_, y)| x.total_cmp(y))
                .expect("three orientations");
            if min_o < -eps {
                match self.cells[t].neighbors[worst] {
                    Some(next) => {
                        t = next;
                        continue;
                    }
                    None => {
                        return Err(InterpError::DegenerateGeometry {
                            reason: "point escaped the enclosing triangle during construction"
                                .to_string(),
                        });
                    }
                }
            }
            if min_o.abs() <= eps {
                return Ok(BuildLocation::OnEdge(t, worst));
            }
            return Ok(BuildLocation::Inside(t));
        }
    }

    /// Repoints the neighbor slot of `cell` that references `from` to `to`.
    fn redirect(&mut self, cell: Option<usize>, from: usize, to: usize) {
        if let Some(c) = cell
            && let Some(j) = self.cells[c].neighbors.iter().position(|&n| n == Some(from))
        {
            self.cells[c].neighbors[j] = Some(to);
        }
    }

    /// Splits cell `t` into three around interior vertex `v`.
    fn split_cell(&mut self, t: usize, v: usize) {
        let orig = self.cells[t];
        let [a, b, c] = orig.vertices;
        let [na, nb, nc] = orig.neighbors;
        let i1 = self.cells.len();
        let i2 = i1 + 1;

        self.cells[t] = TriangleCell {
            vertices: [a, b, v],
            neighbors: [Some(i1), Some(i2), nc],
        };
        self.cells.push(TriangleCell {
            vertices: [b, c, v],
            neighbors: [Some(i2), Some(t), na],
        });
        self.cells.push(TriangleCell {
            vertices: [c, a, v],
            neighbors: [Some(t), Some(i1), nb],
        });

        self.redirect(na, t, i1);
        self.redirect(nb, t, i2);

        self.suspect.extend([t, i1, i2]);
    }

    /// Splits the two cells flanking edge `k` of cell `t` into four around
    /// vertex `v` on that edge. Falls back to a cell split when the edge
    /// has no partner cell.
    fn split_edge(&mut self, t: usize, k: usize, v: usize) {
        let Some(u) = self.cells[t].neighbors[k] else {
            self.split_cell(t, v);
            return;
        };
        let tc = self.cells[t];
        let a = tc.vertices[k];
        let p = tc.vertices[(k + 1) % 3];
        let q = tc.vertices[(k + 2) % 3];
        let n_ap = tc.neighbors[(k + 2) % 3];
        let n_qa = tc.neighbors[(k + 1) % 3];

        let uc = self.cells[u];
        let j = uc
            .neighbors
            .iter()
            .position(|&n| n == Some(t))
            .expect("edge partner must link back");
        let d = uc.vertices[j];
        debug_assert_eq!(uc.vertices[(j + 1) % 3], q);
        debug_assert_eq!(uc.vertices[(j + 2) % 3], p);
        let n_dq = uc.neighbors[(j + 2) % 3];
        let n_pd = uc.neighbors[(j + 1) % 3];

        let i_tb = self.cells.len();
        let i_ub = i_tb + 1;

        self.cells[t] = TriangleCell {
            vertices: [a, p, v],
            neighbors: [Some(i_ub), Some(i_tb), n_ap],
        };
        self.cells[u] = TriangleCell {
            vertices: [d, q, v],
            neighbors: [Some(i_tb), Some(i_ub), n_dq],
        };
        self.cells.push(TriangleCell {
            vertices: [a, v, q],
            neighbors: [Some(u), n_qa, Some(t)],
        });
        self.cells.push(TriangleCell {
            vertices: [d, v, p],
            neighbors: [Some(t), n_pd, Some(u)],
        });

        self.redirect(n_qa, t, i_tb);
        self.redirect(n_pd, u, i_ub);

        self.suspect.extend([t, u, i_tb, i_ub]);
    }

    /// Flips the edge opposite local vertex `k` of cell `t`, returning the
    /// partner cell. Both cells contain the driving vertex afterwards.
    fn flip(&mut self, t: usize, k: usize) -> usize {
        let tc = self.cells[t];
        let v = tc.vertices[k];
        let a = tc.vertices[(k + 1) % 3];
        let b = tc.vertices[(k + 2) % 3];
        let n_bv = tc.neighbors[(k + 1) % 3];
        let n_va = tc.neighbors[(k + 2) % 3];
        let u = tc.neighbors[k].expect("flip requires a partner cell");

        let uc = self.cells[u];
        let j = uc
            .neighbors
            .iter()
            .position(|&n| n == Some(t))
            .expect("edge partner must link back");
        let d = uc.vertices[j];
        let n_ad = uc.neighbors[(j + 1) % 3];
        let n_db = uc.neighbors[(j + 2) % 3];

        self.cells[t] = TriangleCell {
            vertices: [v, a, d],
            neighbors: [n_ad, Some(u), n_va],
        };
        self.cells[u] = TriangleCell {
            vertices: [v, d, b],
            neighbors: [n_db, n_bv, Some(t)],
        };

        self.redirect(n_ad, u, t);
        self.redirect(n_bv, t, u);
        u
    }

    /// Restores the local Delaunay property around newly inserted vertex
    /// `v` by flipping every illegal suspect edge outward.
    fn legalize(&mut self, v: usize) -> InterpResult<()> {
        let mut flips = 0usize;
        let budget = 8 * self.cells.len() + 64;
        while let Some(t) = self.suspect.pop() {
            let Some(k) = self.cells[t].local_index_of(v) else {
                continue;
            };
            let Some(u) = self.cells[t].neighbors[k] else {
                continue;
            };
            let j = self.cells[u]
                .neighbors
                .iter()
                .position(|&n| n == Some(t))
                .expect("edge partner must link back");
            let apex = self.points[self.cells[u].vertices[j]];
            let [a, b, c] = self.corners(t);
            if D::in_circle(a, b, c, apex) {
                let partner = self.flip(t, k);
                self.suspect.extend([t, partner]);
                flips += 1;
                if flips > budget {
                    return Err(InterpError::DegenerateGeometry {
                        reason: "edge legalization did not terminate".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Locates and inserts vertex `v`, returning a cell incident to it.
    ///
    /// # Errors
    ///
    /// Returns [`InterpError::DuplicatePoint`] if `v` coincides with a
    /// vertex of the cell it lands in, or a degenerate-geometry error if
    /// the walk or legalization fails.
    fn insert(&mut self, v: usize, hint: usize) -> InterpResult<usize> {
        let p = self.points[v];
        let located = self.locate(p, hint)?;
        let t = match located {
            BuildLocation::Inside(t) | BuildLocation::OnEdge(t, _) => t,
        };
        for &corner in &self.cells[t].vertices {
            if corner != v && D::points_coincide(self.points[corner], p) {
                return Err(InterpError::DuplicatePoint {
                    index: v.max(corner),
                    duplicate_of: v.min(corner),
                });
            }
        }
        match located {
            BuildLocation::Inside(t) => self.split_cell(t, v),
            BuildLocation::OnEdge(t, k) => self.split_edge(t, k, v),
        }
        self.legalize(v)?;
        Ok(t)
    }
}

/// Triangulates planar points, inserting them in `sequence` order.
///
/// `points` may be longer than `sequence`; only sequenced vertices are
/// inserted and the bounding box is taken over them. Returns the cell
/// vertex triples of the final triangulation.
///
/// # Errors
///
/// Returns a degenerate-input error for non-finite coordinates, duplicate
/// points, or an all-collinear sequence.
pub(crate) fn triangulate_planar(
    points: &[Point2],
    sequence: &[usize],
) -> InterpResult<Vec<[usize; 3]>> {
    for &v in sequence {
        if !points[v].is_finite() {
            return Err(InterpError::DegenerateGeometry {
                reason: format!("non-finite coordinate at vertex {v}"),
            });
        }
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &v in sequence {
        min_x = min_x.min(points[v].x);
        min_y = min_y.min(points[v].y);
        max_x = max_x.max(points[v].x);
        max_y = max_y.max(points[v].y);
    }
    let delta = (max_x - min_x).max(max_y - min_y).max(1.0);
    let margin = SUPER_MARGIN * delta;

    let n = points.len();
    let mut all_points = points.to_vec();
    all_points.push(Point2::new(min_x - margin, min_y - delta));
    all_points.push(Point2::new(max_x + margin, min_y - delta));
    all_points.push(Point2::new(min_x.midpoint(max_x), max_y + margin));

    let mut builder = DelaunayBuilder::<Planar> {
        points: all_points,
        cells: vec![TriangleCell::new([n, n + 1, n + 2])],
        suspect: Vec::new(),
    };

    let mut hint = 0;
    for &v in sequence {
        hint = builder.insert(v, hint)?;
    }

    let triples: Vec<[usize; 3]> = builder
        .cells
        .iter()
        .map(|c| c.vertices)
        .filter(|vs| vs.iter().all(|&v| v < n))
        .collect();
    if triples.is_empty() {
        return Err(InterpError::DegenerateGeometry {
            reason: "all input points are collinear".to_string(),
        });
    }
    log::debug!(
        "planar triangulation: {} vertices, {} cells",
        sequence.len(),
        triples.len()
    );
    Ok(triples)
}

/// Triangulates points on the unit sphere, covering the whole surface.
///
/// The final entry of `sequence` serves as the stereographic pivot; the
/// rest are triangulated in the projection plane in sequence order.
///
/// # Errors
///
/// Returns a degenerate-input error for fewer than four points, duplicate
/// points, all points on one great circle, or a point set that does not
/// span the sphere (some cell would be inverted).
pub(crate) fn triangulate_spherical(
    points: &[SpherePoint],
    sequence: &[usize],
) -> InterpResult<Vec<[usize; 3]>> {
    if sequence.len() < 4 {
        return Err(InterpError::DegenerateGeometry {
            reason: "a spherical triangulation needs at least 4 points to cover the sphere"
                .to_string(),
        });
    }
    let pivot = *sequence.last().expect("non-empty sequence");
    let pivot_point = points[pivot];
    if !pivot_point.is_finite() {
        return Err(InterpError::DegenerateGeometry {
            reason: format!("non-finite coordinate at vertex {pivot}"),
        });
    }

    // Stereographic projection from the pivot onto its tangent basis:
    // the pivot maps to infinity, its antipode to the origin.
    let (e1, e2) = pivot_point.tangent_frame();
    let u = pivot_point.as_array();
    let mut projected = vec![Point2::new(0.0, 0.0); points.len()];
    for &v in &sequence[..sequence.len() - 1] {
        let q = points[v];
        if !q.is_finite() {
            return Err(InterpError::DegenerateGeometry {
                reason: format!("non-finite coordinate at vertex {v}"),
            });
        }
        if Spherical::points_coincide(q, pivot_point) {
            return Err(InterpError::DuplicatePoint {
                index: v.max(pivot),
                duplicate_of: v.min(pivot),
            });
        }
        let qa = q.as_array();
        let denom = 1.0 - (qa[0] * u[0] + qa[1] * u[1] + qa[2] * u[2]);
        projected[v] = Point2::new(
            (qa[0] * e1[0] + qa[1] * e1[1] + qa[2] * e1[2]) / denom,
            (qa[0] * e2[0] + qa[1] * e2[1] + qa[2] * e2[2]) / denom,
        );
    }

    let planar = triangulate_planar(&projected, &sequence[..sequence.len() - 1]).map_err(|e| {
        match e {
            InterpError::DegenerateGeometry { .. } => InterpError::DegenerateGeometry {
                reason: "all points lie on a single great circle".to_string(),
            },
            other => other,
        }
    })?;

    // Map back to the sphere. Stereographic projection reverses
    // orientation, so each planar triple is swapped; the planar hull is
    // fanned to the pivot.
    let mut directed = HashSet::new();
    for &[a, b, c] in &planar {
        directed.insert((a, b));
        directed.insert((b, c));
        directed.insert((c, a));
    }
    let mut cells: Vec<TriangleCell> = planar
        .iter()
        .map(|&[a, b, c]| TriangleCell::new([b, a, c]))
        .collect();
    let fan_start = cells.len();
    for &[a, b, c] in &planar {
        for (f, t) in [(a, b), (b, c), (c, a)] {
            if !directed.contains(&(t, f)) {
                cells.push(TriangleCell::new([f, t, pivot]));
            }
        }
    }

    link_neighbors(&mut cells)?;
    let suspect: Vec<usize> = (fan_start..cells.len()).collect();
    let mut builder = DelaunayBuilder::<Spherical> {
        points: points.to_vec(),
        cells,
        suspect,
    };
    builder.legalize(pivot)?;

    for (t, cell) in builder.cells.iter().enumerate() {
        let [a, b, c] = cell.vertices;
        if Spherical::orient(points[a], points[b], points[c]) <= 0.0 {
            log::debug!("inverted spherical cell {t}: {:?}", cell.vertices);
            return Err(InterpError::DegenerateGeometry {
                reason: "point set does not span the sphere".to_string(),
            });
        }
    }
    log::debug!(
        "spherical triangulation: {} vertices, {} cells",
        sequence.len(),
        builder.cells.len()
    );
    Ok(builder.cells.iter().map(|c| c.vertices).collect())
}

/// Checks that `order` is a permutation of `0..n`.
///
/// # Errors
///
/// Returns [`InterpError::DegenerateGeometry`] describing the violation.
pub(crate) fn validate_order(n: usize, order: &[usize]) -> InterpResult<()> {
    if order.len() != n {
        return Err(InterpError::DegenerateGeometry {
            reason: format!("insertion hint has {} entries for {n} points", order.len()),
        });
    }
    let mut seen = vec![false; n];
    for &v in order {
        if v >= n || seen[v] {
            return Err(InterpError::DegenerateGeometry {
                reason: "insertion hint is not a permutation of the vertex indices".to_string(),
            });
        }
        seen[v] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::predicates::{in_circumcap, in_circumcircle};

    fn planar_points(coords: &[(f64, f64)]) -> Vec<Point2> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    fn default_sequence(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_unit_square_two_cells() {
        let points = planar_points(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let triples = triangulate_planar(&points, &default_sequence(4)).expect("triangulates");
        assert_eq!(triples.len(), 2, "a square splits into two triangles");
        for [a, b, c] in &triples {
            let o = Planar::orient(points[*a], points[*b], points[*c]);
            assert!(o > 0.0, "cells must be counterclockwise");
        }
    }

    #[test]
    fn test_single_triangle() {
        let points = planar_points(&[(0.0, 0.0), (4.0, 0.0), (1.0, 3.0)]);
        let triples = triangulate_planar(&points, &default_sequence(3)).expect("triangulates");
        assert_eq!(triples.len(), 1);
    }

    #[test]
    fn test_collinear_points_rejected() {
        let points = planar_points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let result = triangulate_planar(&points, &default_sequence(4));
        assert!(matches!(
            result,
            Err(InterpError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_duplicate_points_rejected() {
        let points = planar_points(&[(0.0, 0.0), (1.0, 0.0), (0.5, 1.0), (1.0, 0.0)]);
        let result = triangulate_planar(&points, &default_sequence(4));
        assert!(matches!(
            result,
            Err(InterpError::DuplicatePoint {
                index: 3,
                duplicate_of: 1
            })
        ));
    }

    #[test]
    fn test_point_on_edge_is_inserted() {
        // The fourth point sits exactly on the diagonal of the first three
        let points = planar_points(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (1.0, 1.0), (2.0, 2.0)]);
        let triples = triangulate_planar(&points, &default_sequence(5)).expect("triangulates");
        let used: HashSet<usize> = triples.iter().flatten().copied().collect();
        assert!(used.contains(&3), "on-edge vertex must appear in a cell");
    }

    /// Brute-force empty-circumcircle check over every cell/vertex pair.
    fn assert_planar_delaunay(points: &[Point2], triples: &[[usize; 3]]) {
        for &[a, b, c] in triples {
            for (v, &p) in points.iter().enumerate() {
                if v == a || v == b || v == c {
                    continue;
                }
                assert!(
                    !in_circumcircle(points[a], points[b], points[c], p),
                    "vertex {v} violates the circumcircle of cell ({a}, {b}, {c})"
                );
            }
        }
    }

    #[test]
    fn test_random_cloud_is_delaunay() {
        use rand::{RngExt, SeedableRng, rngs::StdRng};
        let mut rng = StdRng::seed_from_u64(7);
        let points: Vec<Point2> = (0..60)
            .map(|_| Point2::new(rng.random_range(0.0..10.0), rng.random_range(0.0..10.0)))
            .collect();
        let triples =
            triangulate_planar(&points, &default_sequence(points.len())).expect("triangulates");
        assert_planar_delaunay(&points, &triples);

        let used: HashSet<usize> = triples.iter().flatten().copied().collect();
        assert_eq!(used.len(), points.len(), "every vertex appears in a cell");
    }

    #[test]
    fn test_octahedron_covers_sphere() {
        let points = vec![
            SpherePoint::normalized(1.0, 0.0, 0.0).unwrap(),
            SpherePoint::normalized(-1.0, 0.0, 0.0).unwrap(),
            SpherePoint::normalized(0.0, 1.0, 0.0).unwrap(),
            SpherePoint::normalized(0.0, -1.0, 0.0).unwrap(),
            SpherePoint::normalized(0.0, 0.0, 1.0).unwrap(),
            SpherePoint::normalized(0.0, 0.0, -1.0).unwrap(),
        ];
        let triples =
            triangulate_spherical(&points, &default_sequence(6)).expect("triangulates");
        assert_eq!(triples.len(), 8, "octahedron has 8 faces");
        for [a, b, c] in &triples {
            assert!(
                Spherical::orient(points[*a], points[*b], points[*c]) > 0.0,
                "cells must be counterclockwise viewed from outside"
            );
        }
    }

    #[test]
    fn test_sphere_cell_count_matches_euler() {
        // A closed triangulated sphere has F = 2V - 4
        let points = crate::util::fibonacci_sphere(24);
        let triples =
            triangulate_spherical(&points, &default_sequence(24)).expect("triangulates");
        assert_eq!(triples.len(), 2 * 24 - 4);
    }

    #[test]
    fn test_sphere_is_delaunay() {
        let points = crate::util::fibonacci_sphere(30);
        let triples =
            triangulate_spherical(&points, &default_sequence(30)).expect("triangulates");
        for &[a, b, c] in &triples {
            for (v, &p) in points.iter().enumerate() {
                if v == a || v == b || v == c {
                    continue;
                }
                assert!(
                    !in_circumcap(points[a], points[b], points[c], p),
                    "vertex {v} violates the circumcap of cell ({a}, {b}, {c})"
                );
            }
        }
    }

    #[test]
    fn test_great_circle_points_rejected() {
        // Six points on the equator
        let points: Vec<SpherePoint> = (0..6)
            .map(|i| SpherePoint::from_lonlat_degrees(f64::from(i) * 60.0, 0.0))
            .collect();
        let result = triangulate_spherical(&points, &default_sequence(6));
        assert!(matches!(
            result,
            Err(InterpError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_hemisphere_cluster_rejected() {
        // Points confined near the north pole cannot partition the sphere
        let points: Vec<SpherePoint> = (0..8)
            .map(|i| SpherePoint::from_lonlat_degrees(f64::from(i) * 45.0, 70.0))
            .collect();
        let result = triangulate_spherical(&points, &default_sequence(8));
        assert!(matches!(
            result,
            Err(InterpError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_validate_order() {
        assert!(validate_order(3, &[2, 0, 1]).is_ok());
        assert!(validate_order(3, &[0, 1]).is_err());
        assert!(validate_order(3, &[0, 1, 1]).is_err());
        assert!(validate_order(3, &[0, 1, 3]).is_err());
    }
}
