//! Batch interpolation with per-point status classification.
//!
//! Every query is answered: a containing cell yields `Interpolated`, a
//! planar point beyond the hull yields `Extrapolated` through the
//! nearest-boundary-edge extension, and anything unresolvable (non-finite
//! coordinates, a failed locate walk) yields `Invalid` with a NaN value.
//! A batch never aborts on a single bad point; callers must check the
//! status field rather than trusting the value array unconditionally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use float_ord::FloatOrd;
use serde::{Deserialize, Serialize};

use crate::errors::InterpError;
use crate::geometry::domain::Domain;
use crate::interp::gradient::{NodalGradients, estimate_gradients};
use crate::interp::locate::{Location, locate};
use crate::interp::spline::{InterpOrder, blend_cubic, dot2, edge_profile, select_tension};
use crate::mesh::arena::{HullEdge, MeshArena};

/// Classification of one produced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    /// A containing cell was found and the value interpolates the field
    Interpolated,
    /// The query lies outside the hull; the value extends the nearest
    /// boundary cell's interpolant (planar meshes only)
    Extrapolated,
    /// No value could be produced; the value field is NaN
    Invalid,
}

/// One interpolated value with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Interpolated or extrapolated value, NaN when invalid
    pub value: f64,
    /// Classification of this value
    pub status: QueryStatus,
    /// Cell the value was produced from, if any
    pub cell: Option<usize>,
    /// True when an order-3 request fell back to order 1 because a
    /// required nodal gradient is unreliable
    pub degraded_order: bool,
}

impl QueryResult {
    /// An invalid marker result.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            value: f64::NAN,
            status: QueryStatus::Invalid,
            cell: None,
            degraded_order: false,
        }
    }
}

/// Derived per-field data: nodal gradients and auto-selected edge
/// tensions.
#[derive(Debug, Clone)]
pub(crate) struct FieldData {
    pub gradients: Arc<NodalGradients>,
    /// Nonzero tensions keyed by undirected edge; absent edges are slack
    pub tensions: Arc<HashMap<(usize, usize), f64>>,
}

/// Explicit nodal-derivative cache owned by the triangulation handle.
///
/// One entry per field array, keyed by fingerprint: supplying a different
/// field replaces the entry whole (compute-then-publish; the cached data
/// itself is immutable behind `Arc`s).
#[derive(Debug, Default)]
pub(crate) struct DerivativeCache {
    entry: Mutex<Option<(u64, FieldData)>>,
}

impl DerivativeCache {
    /// Returns the cached data for `field`, computing and publishing it on
    /// a fingerprint miss.
    pub(crate) fn fetch<D: Domain>(&self, mesh: &MeshArena<D>, field: &[f64]) -> FieldData {
        let fp = fingerprint(field);
        let mut slot = self.entry.lock().expect("derivative cache poisoned");
        if let Some((cached_fp, data)) = slot.as_ref()
            && *cached_fp == fp
        {
            return data.clone();
        }
        let gradients = Arc::new(estimate_gradients(mesh, field));
        let tensions = Arc::new(edge_tensions(mesh, field, &gradients));
        let data = FieldData {
            gradients,
            tensions,
        };
        log::debug!(
            "derivative cache rebuilt: {} tensioned edges, fingerprint {fp:#018x}",
            data.tensions.len()
        );
        *slot = Some((fp, data.clone()));
        data
    }
}

/// 64-bit FNV-1a over the field's bit patterns and length.
fn fingerprint(field: &[f64]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    let mut mix = |value: u64| {
        for byte in value.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
    };
    mix(field.len() as u64);
    for &z in field {
        mix(z.to_bits());
    }
    hash
}

/// Auto-selects a tension for every edge whose plain cubic would escape
/// the value range of the endpoints' neighbor rings.
pub(crate) fn edge_tensions<D: Domain>(
    mesh: &MeshArena<D>,
    field: &[f64],
    gradients: &NodalGradients,
) -> HashMap<(usize, usize), f64> {
    // Value range around each vertex: itself plus its ring
    let ranges: Vec<(f64, f64)> = (0..mesh.npoints())
        .map(|v| {
            let mut lo = field[v];
            let mut hi = field[v];
            for &w in &mesh.neighbor_ring(v) {
                lo = lo.min(field[w]);
                hi = hi.max(field[w]);
            }
            (lo, hi)
        })
        .collect();

    let mut tensions = HashMap::new();
    for (a, b) in mesh.edges() {
        let pa = mesh.point(a);
        let pb = mesh.point(b);
        let len = D::distance(pa, pb);
        let da = dot2(gradients.component(a), D::direction_components(pa, pb)) * len;
        let db = -dot2(gradients.component(b), D::direction_components(pb, pa)) * len;
        let lo = ranges[a].0.min(ranges[b].0);
        let hi = ranges[a].1.max(ranges[b].1);
        let sigma = select_tension(field[a], field[b], da, db, lo, hi);
        if sigma > 0.0 {
            tensions.insert((a, b), sigma);
        }
    }
    tensions
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn tension_of(tensions: &HashMap<(usize, usize), f64>, a: usize, b: usize) -> f64 {
    tensions.get(&edge_key(a, b)).copied().unwrap_or(0.0)
}

/// Interpolates a batch of query points, threading the last located cell
/// as the next walk hint. `data` is required for order 3 only.
pub(crate) fn interpolate_batch<D: Domain>(
    mesh: &MeshArena<D>,
    field: &[f64],
    data: Option<&FieldData>,
    queries: &[D::Point],
    order: InterpOrder,
) -> Vec<QueryResult> {
    let mut hint = None;
    let mut results = Vec::with_capacity(queries.len());
    for &p in queries {
        let result = match locate(mesh, p, hint) {
            Ok(Location::Inside { cell }) => {
                hint = Some(cell);
                evaluate_inside(mesh, field, data, cell, p, order)
            }
            Ok(Location::Outside { edge, param }) => {
                hint = Some(edge.cell);
                extrapolate(mesh, field, data, edge, param, p, order)
            }
            Err(InterpError::LocateFailed { steps }) => {
                log::debug!("query walk cycled after {steps} steps; marking invalid");
                QueryResult::invalid()
            }
            Err(_) => QueryResult::invalid(),
        };
        results.push(result);
    }
    results
}

/// Evaluates one query inside its containing cell.
pub(crate) fn evaluate_inside<D: Domain>(
    mesh: &MeshArena<D>,
    field: &[f64],
    data: Option<&FieldData>,
    cell: usize,
    p: D::Point,
    order: InterpOrder,
) -> QueryResult {
    let vs = mesh.cell(cell).vertices;
    let corners = mesh.corners(cell);
    let values = [field[vs[0]], field[vs[1]], field[vs[2]]];

    match order {
        InterpOrder::Nearest => {
            let (v, _) = vs
                .iter()
                .map(|&v| (v, D::distance(mesh.point(v), p)))
                .min_by_key(|&(_, d)| FloatOrd(d))
                .expect("three corners");
            QueryResult {
                value: field[v],
                status: QueryStatus::Interpolated,
                cell: Some(cell),
                degraded_order: false,
            }
        }
        InterpOrder::Linear => linear_result::<D>(corners, values, p, cell),
        InterpOrder::CubicTension => {
            let data = data.expect("order 3 requires derivative data");
            if vs.iter().any(|&v| data.gradients.is_unreliable(v)) {
                let mut result = linear_result::<D>(corners, values, p, cell);
                result.degraded_order = true;
                return result;
            }
            let Some(bary) = D::barycentric(corners[0], corners[1], corners[2], p) else {
                return QueryResult::invalid();
            };
            let gradients = [
                data.gradients.component(vs[0]),
                data.gradients.component(vs[1]),
                data.gradients.component(vs[2]),
            ];
            let sigma = [
                tension_of(&data.tensions, vs[1], vs[2]),
                tension_of(&data.tensions, vs[2], vs[0]),
                tension_of(&data.tensions, vs[0], vs[1]),
            ];
            let clamped = [
                bary[0].clamp(0.0, 1.0),
                bary[1].clamp(0.0, 1.0),
                bary[2].clamp(0.0, 1.0),
            ];
            let value = blend_cubic::<D>(corners, values, gradients, sigma, clamped);
            QueryResult {
                value,
                status: QueryStatus::Interpolated,
                cell: Some(cell),
                degraded_order: false,
            }
        }
    }
}

fn linear_result<D: Domain>(
    corners: [D::Point; 3],
    values: [f64; 3],
    p: D::Point,
    cell: usize,
) -> QueryResult {
    let Some(bary) = D::barycentric(corners[0], corners[1], corners[2], p) else {
        return QueryResult::invalid();
    };
    QueryResult {
        value: bary[0].mul_add(values[0], bary[1].mul_add(values[1], bary[2] * values[2])),
        status: QueryStatus::Interpolated,
        cell: Some(cell),
        degraded_order: false,
    }
}

/// Extends the interpolant beyond the hull (planar meshes).
///
/// Order 1 extends the nearest boundary cell's affine interpolant; order 3
/// is a first-order Taylor step from the clamped projection onto the
/// nearest boundary edge. Both coincide with the interior interpolant on
/// the hull itself, so values vary continuously across the boundary.
fn extrapolate<D: Domain>(
    mesh: &MeshArena<D>,
    field: &[f64],
    data: Option<&FieldData>,
    edge: HullEdge,
    param: f64,
    p: D::Point,
    order: InterpOrder,
) -> QueryResult {
    let cell = edge.cell;
    let vs = mesh.cell(cell).vertices;
    let corners = mesh.corners(cell);
    let values = [field[vs[0]], field[vs[1]], field[vs[2]]];

    match order {
        InterpOrder::Nearest => {
            let (v, _) = vs
                .iter()
                .map(|&v| (v, D::distance(mesh.point(v), p)))
                .min_by_key(|&(_, d)| FloatOrd(d))
                .expect("three corners");
            QueryResult {
                value: field[v],
                status: QueryStatus::Extrapolated,
                cell: Some(cell),
                degraded_order: false,
            }
        }
        InterpOrder::Linear => {
            let mut result = linear_result::<D>(corners, values, p, cell);
            if result.status == QueryStatus::Interpolated {
                result.status = QueryStatus::Extrapolated;
            }
            result
        }
        InterpOrder::CubicTension => {
            let data = data.expect("order 3 requires derivative data");
            let (a, b) = (edge.from, edge.to);
            if data.gradients.is_unreliable(a) || data.gradients.is_unreliable(b) {
                let mut result = linear_result::<D>(corners, values, p, cell);
                if result.status == QueryStatus::Interpolated {
                    result.status = QueryStatus::Extrapolated;
                }
                result.degraded_order = true;
                return result;
            }
            let (value, grad, foot) = edge_profile::<D>(
                mesh.point(a),
                mesh.point(b),
                field[a],
                field[b],
                data.gradients.component(a),
                data.gradients.component(b),
                tension_of(&data.tensions, a, b),
                param,
            );
            let offset = D::distance(foot, p);
            let dir = D::direction_components(foot, p);
            QueryResult {
                value: dot2(grad, dir).mul_add(offset, value),
                status: QueryStatus::Extrapolated,
                cell: Some(cell),
                degraded_order: false,
            }
        }
    }
}
