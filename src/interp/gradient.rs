//! Nodal gradient estimation.
//!
//! Gradients are estimated per vertex from the ordered neighbor ring by an
//! inverse-distance-weighted least-squares plane fit in the vertex's own
//! tangent basis, then refined by a bounded global relaxation pass that
//! couples neighboring gradients through the mesh edges (a discrete
//! thin-plate-like smoothing). Vertices whose ring is degenerate get a zero
//! gradient and an unreliable flag instead of an error; queries that depend
//! on them degrade to linear interpolation.

use crate::geometry::domain::Domain;
use crate::mesh::arena::MeshArena;

/// Cap on global relaxation sweeps; the best available estimate is
/// returned once it is reached.
const RELAX_MAX_SWEEPS: usize = 20;

/// Convergence tolerance on the largest per-sweep component change.
const RELAX_TOL: f64 = 1e-10;

/// Coupling strength between the local fit and the neighbor average.
const RELAX_LAMBDA: f64 = 0.5;

/// Per-vertex gradient estimates for one field array.
///
/// Components are `(x, y)` on the plane and tangent-plane `(east, north)`
/// on the sphere.
#[derive(Debug, Clone)]
pub struct NodalGradients {
    components: Vec<[f64; 2]>,
    unreliable: Vec<bool>,
}

impl NodalGradients {
    /// Builds gradients from externally supplied components, all marked
    /// reliable.
    #[must_use]
    pub fn from_components(components: Vec<[f64; 2]>) -> Self {
        let unreliable = vec![false; components.len()];
        Self {
            components,
            unreliable,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_unreliable(components: Vec<[f64; 2]>, unreliable: Vec<bool>) -> Self {
        Self {
            components,
            unreliable,
        }
    }

    /// Number of vertices covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if no vertices are covered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Gradient components at vertex `v`.
    #[must_use]
    pub fn component(&self, v: usize) -> [f64; 2] {
        self.components[v]
    }

    /// All gradient components, indexed by vertex.
    #[must_use]
    pub fn components(&self) -> &[[f64; 2]] {
        &self.components
    }

    /// Whether the estimate at vertex `v` came from a degenerate ring.
    #[must_use]
    pub fn is_unreliable(&self, v: usize) -> bool {
        self.unreliable[v]
    }

    /// Number of vertices flagged unreliable.
    #[must_use]
    pub fn unreliable_count(&self) -> usize {
        self.unreliable.iter().filter(|&&u| u).count()
    }
}

/// Estimates nodal gradients for `field` over the mesh.
///
/// `field` must already be validated against the vertex count.
#[must_use]
pub(crate) fn estimate_gradients<D: Domain>(mesh: &MeshArena<D>, field: &[f64]) -> NodalGradients {
    let n = mesh.npoints();
    let mut components = vec![[0.0, 0.0]; n];
    let mut unreliable = vec![false; n];

    // Stage 1: weighted least-squares plane fit over each neighbor ring
    for v in 0..n {
        let ring = mesh.neighbor_ring(v);
        match local_fit(mesh, field, v, &ring) {
            Some(g) => components[v] = g,
            None => unreliable[v] = true,
        }
    }
    let bad = unreliable.iter().filter(|&&u| u).count();
    if bad > 0 {
        log::warn!("{bad} of {n} vertices have unreliable gradient estimates");
    }

    // Stage 2: bounded Jacobi relaxation anchored at the local fits
    let anchors = components.clone();
    for sweep in 0..RELAX_MAX_SWEEPS {
        let mut next = components.clone();
        let mut max_change: f64 = 0.0;
        for v in 0..n {
            if unreliable[v] {
                continue;
            }
            let pv = mesh.point(v);
            let mut acc = [anchors[v][0], anchors[v][1]];
            let mut coupling = 0.0;
            for &w in &mesh.neighbor_ring(v) {
                if unreliable[w] {
                    continue;
                }
                let dist = D::distance(pv, mesh.point(w));
                if dist <= f64::EPSILON {
                    continue;
                }
                let wgt = RELAX_LAMBDA / (dist * dist);
                let moved = D::transport(mesh.point(w), pv, components[w]);
                acc[0] += wgt * moved[0];
                acc[1] += wgt * moved[1];
                coupling += wgt;
            }
            let denom = 1.0 + coupling;
            let updated = [acc[0] / denom, acc[1] / denom];
            max_change = max_change
                .max((updated[0] - components[v][0]).abs())
                .max((updated[1] - components[v][1]).abs());
            next[v] = updated;
        }
        components = next;
        if max_change < RELAX_TOL {
            log::debug!("gradient relaxation converged after {} sweeps", sweep + 1);
            break;
        }
    }

    NodalGradients {
        components,
        unreliable,
    }
}

/// Inverse-distance-weighted plane fit of the field over one ring.
///
/// Returns `None` when the normal system is singular (collinear or
/// coincident neighbors).
fn local_fit<D: Domain>(
    mesh: &MeshArena<D>,
    field: &[f64],
    v: usize,
    ring: &[usize],
) -> Option<[f64; 2]> {
    if ring.len() < 2 {
        return None;
    }
    let pv = mesh.point(v);
    let mut a11 = 0.0;
    let mut a12 = 0.0;
    let mut a22 = 0.0;
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for &w in ring {
        let pw = mesh.point(w);
        let dist = D::distance(pv, pw);
        if dist <= f64::EPSILON {
            continue;
        }
        let dir = D::direction_components(pv, pw);
        let x = dir[0] * dist;
        let y = dir[1] * dist;
        let wgt = 1.0 / (dist * dist);
        let dz = field[w] - field[v];
        a11 += wgt * x * x;
        a12 += wgt * x * y;
        a22 += wgt * y * y;
        b1 += wgt * x * dz;
        b2 += wgt * y * dz;
    }
    let det = a11 * a22 - a12 * a12;
    if det <= 1e-14 * (a11 + a22) * (a11 + a22) {
        return None;
    }
    Some([(a22 * b1 - a12 * b2) / det, (a11 * b2 - a12 * b1) / det])
}
