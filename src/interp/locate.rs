//! Walk-based point location over the triangulation's adjacency structure.
//!
//! The walk starts from a hint cell (batch callers thread the last hit) and
//! repeatedly crosses the edge whose opposite half-plane or hemisphere
//! contains the query, which takes O(sqrt n) expected steps on
//! well-distributed meshes. A visited set bounds the walk on degenerate
//! geometry: revisiting a cell without resolving fails with
//! [`InterpError::LocateFailed`] instead of looping forever.

use std::collections::HashSet;

use float_ord::FloatOrd;

use crate::errors::{InterpError, InterpResult};
use crate::geometry::domain::Domain;
use crate::mesh::arena::{HullEdge, MeshArena};

/// Outcome of locating a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
    /// The query lies in (or on the boundary of) a cell
    Inside {
        /// Index of the containing cell
        cell: usize,
    },
    /// The query lies outside the hull; the nearest boundary edge and the
    /// clamped parameter of the closest point along it are reported
    Outside {
        /// Nearest hull edge
        edge: HullEdge,
        /// Parameter in `[0, 1]` of the closest point on that edge
        param: f64,
    },
}

/// Locates the cell containing `p`, walking from `hint`.
///
/// # Errors
///
/// Returns [`InterpError::NonFiniteQuery`] for NaN or infinite coordinates
/// and [`InterpError::LocateFailed`] when the walk cycles (recoverable:
/// batch callers mark the point invalid and continue).
pub fn locate<D: Domain>(
    mesh: &MeshArena<D>,
    p: D::Point,
    hint: Option<usize>,
) -> InterpResult<Location> {
    if !D::is_finite(p) {
        return Err(InterpError::NonFiniteQuery);
    }

    let mut t = hint.unwrap_or(0).min(mesh.ncells() - 1);
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(t) {
            return Err(InterpError::LocateFailed {
                steps: visited.len(),
            });
        }
        let [a, b, c] = mesh.corners(t);
        let orients = [
            D::orient(b, c, p),
            D::orient(c, a, p),
            D::orient(a, b, p),
        ];
        let (worst, &min_o) = orients
            .iter()
            .enumerate()
            .min_by(|(_, x), (_, y)| x.total_cmp(y))
            .expect("three orientations");
        let scale = orients.iter().fold(f64::MIN_POSITIVE, |m, o| m.max(o.abs()));
        if min_o >= -1e-12 * scale {
            return Ok(Location::Inside { cell: t });
        }
        match mesh.cell(t).neighbors[worst] {
            Some(next) => t = next,
            None => return Ok(nearest_hull_edge(mesh, p)),
        }
    }
}

/// Scans the hull for the boundary edge closest to `p`.
fn nearest_hull_edge<D: Domain>(mesh: &MeshArena<D>, p: D::Point) -> Location {
    let (edge, param) = mesh
        .hull()
        .iter()
        .map(|&e| {
            let a = mesh.point(e.from);
            let b = mesh.point(e.to);
            let t = D::closest_edge_param(a, b, p);
            let dist = D::distance(D::point_on_edge(a, b, t), p);
            (e, t, dist)
        })
        .min_by_key(|&(_, _, dist)| FloatOrd(dist))
        .map(|(e, t, _)| (e, t))
        .expect("planar meshes always carry hull edges");
    Location::Outside { edge, param }
}
