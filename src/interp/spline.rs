//! Hermite tension splines and the triangular interpolant built from them.
//!
//! An edge interpolant matches value and tangential derivative at both
//! endpoints; its tension parameter pulls it from a full cubic (tension 0)
//! toward the chord (large tension), which is how overshoot near steep
//! gradients is suppressed. A triangle is interpolated by the side-vertex
//! scheme: one tension spline runs from each vertex through the query to
//! the opposite edge, and the three are blended with squared-barycentric
//! weights. On a triangle edge the blend reduces exactly to that edge's own
//! spline, so values are continuous across cell boundaries.

use serde::{Deserialize, Serialize};

use crate::geometry::domain::Domain;

/// Largest usable tension; beyond this the spline is visually the chord.
pub(crate) const SIGMA_MAX: f64 = 50.0;

/// Below this tension the closed-form cubic branch is used; the tension
/// correction there is under a few parts in 1e5 and the tension form loses
/// precision.
const SIGMA_CUBIC: f64 = 1e-2;

/// Sample count for the overshoot scan along an edge.
const TENSION_SAMPLES: usize = 16;

/// Bisection refinement steps for automatic tension selection.
const TENSION_BISECTION_STEPS: usize = 10;

/// Interpolation order selector.
///
/// Exactly three algorithms exist, so this is a closed set rather than an
/// extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpOrder {
    /// Order 0: value of the nearest vertex of the located cell
    Nearest,
    /// Order 1: barycentric combination of the cell's vertex values
    Linear,
    /// Order 3: cubic Hermite tension splines blended over the cell
    CubicTension,
}

impl InterpOrder {
    /// Maps the conventional 0/1/3 selector to an order.
    #[must_use]
    pub const fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Self::Nearest),
            1 => Some(Self::Linear),
            3 => Some(Self::CubicTension),
            _ => None,
        }
    }

    /// The conventional numeric selector for this order.
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Linear => 1,
            Self::CubicTension => 3,
        }
    }
}

impl std::fmt::Display for InterpOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Linear => write!(f, "linear"),
            Self::CubicTension => write!(f, "cubic-tension"),
        }
    }
}

/// Hermite interpolant under tension on the unit interval.
///
/// Matches values `z0`, `z1` and derivatives `s0`, `s1` (per unit
/// parameter) at the interval ends. Tension `sigma = 0` gives the plain
/// cubic Hermite; increasing tension flattens the interior toward the
/// chord while keeping the endpoint data.
#[derive(Debug, Clone, Copy)]
pub struct TensionHermite {
    form: Form,
}

#[derive(Debug, Clone, Copy)]
enum Form {
    Cubic {
        z0: f64,
        z1: f64,
        s0: f64,
        s1: f64,
    },
    Tension {
        z0: f64,
        z1: f64,
        delta: f64,
        c: f64,
        d: f64,
        sigma: f64,
    },
}

/// `sinh(sigma u) / sinh(sigma)` for `u` in `[0, 1]`, evaluated with only
/// decaying exponentials so large tensions neither overflow nor cancel.
fn sinh_ratio(sigma: f64, u: f64) -> f64 {
    (sigma * (u - 1.0)).exp() * (-(-2.0 * sigma * u).exp_m1()) / (-(-2.0 * sigma).exp_m1())
}

/// `cosh(sigma u) / sinh(sigma)` for `u` in `[0, 1]`, same treatment.
fn cosh_ratio(sigma: f64, u: f64) -> f64 {
    (sigma * (u - 1.0)).exp() * (1.0 + (-2.0 * sigma * u).exp()) / (-(-2.0 * sigma).exp_m1())
}

/// Tension correction basis `g(u) = sinh(sigma u)/sinh(sigma) - u`, which
/// vanishes at both interval ends.
fn g_basis(sigma: f64, u: f64) -> f64 {
    sinh_ratio(sigma, u) - u
}

fn g_basis_deriv(sigma: f64, u: f64) -> f64 {
    sigma.mul_add(cosh_ratio(sigma, u), -1.0)
}

impl TensionHermite {
    /// Fits the interpolant to endpoint values and derivatives.
    #[must_use]
    pub fn fit(z0: f64, z1: f64, s0: f64, s1: f64, sigma: f64) -> Self {
        let sigma = sigma.clamp(0.0, SIGMA_MAX);
        if sigma < SIGMA_CUBIC {
            return Self {
                form: Form::Cubic { z0, z1, s0, s1 },
            };
        }
        // The tension spline satisfies f'''' = sigma^2 f''. Writing it as
        // the chord plus boundary-layer corrections
        //   f(t) = z0 (1 - t) + z1 t + c g(1 - t) + d g(t)
        // the endpoint derivative conditions reduce to a symmetric 2x2
        // system in c and d, with p = g'(0) and q = g'(1).
        let em2 = (-2.0 * sigma).exp_m1();
        let p = sigma * 2.0 * (-sigma).exp() / (-em2) - 1.0;
        let q = sigma * (2.0 + em2) / (-em2) - 1.0;
        let delta = z1 - z0;
        let r0 = s0 - delta;
        let r1 = s1 - delta;
        let det = p * p - q * q;
        let c = (q * r0 - p * r1) / det;
        let d = (p * r0 - q * r1) / det;
        Self {
            form: Form::Tension {
                z0,
                z1,
                delta,
                c,
                d,
                sigma,
            },
        }
    }

    /// Value at parameter `t` in `[0, 1]`.
    #[must_use]
    pub fn value(&self, t: f64) -> f64 {
        match self.form {
            Form::Cubic { z0, z1, s0, s1 } => {
                let h00 = (1.0 + 2.0 * t) * (1.0 - t) * (1.0 - t);
                let h10 = t * (1.0 - t) * (1.0 - t);
                let h01 = t * t * (3.0 - 2.0 * t);
                let h11 = t * t * (t - 1.0);
                h00 * z0 + h10 * s0 + h01 * z1 + h11 * s1
            }
            Form::Tension {
                z0,
                z1,
                c,
                d,
                sigma,
                ..
            } => {
                z0 * (1.0 - t)
                    + z1 * t
                    + c * g_basis(sigma, 1.0 - t)
                    + d * g_basis(sigma, t)
            }
        }
    }

    /// Derivative with respect to `t`.
    #[must_use]
    pub fn derivative(&self, t: f64) -> f64 {
        match self.form {
            Form::Cubic { z0, z1, s0, s1 } => {
                let h00 = 6.0 * t * t - 6.0 * t;
                let h10 = 3.0 * t * t - 4.0 * t + 1.0;
                let h01 = -6.0 * t * t + 6.0 * t;
                let h11 = 3.0 * t * t - 2.0 * t;
                h00 * z0 + h10 * s0 + h01 * z1 + h11 * s1
            }
            Form::Tension {
                delta,
                c,
                d,
                sigma,
                ..
            } => delta - c * g_basis_deriv(sigma, 1.0 - t) + d * g_basis_deriv(sigma, t),
        }
    }
}

/// Selects the smallest tension keeping the edge interpolant inside
/// `[lo, hi]`, the range spanned by the endpoint values and their neighbor
/// rings.
///
/// The interpolant is sampled on a fixed grid; if the plain cubic already
/// stays in range the tension is zero, otherwise it is bisected over
/// `(0, SIGMA_MAX]` for a fixed number of refinement steps. When even the
/// maximum tension cannot contain the curve (endpoint derivatives alone
/// escape the range), the maximum is returned as best effort.
#[must_use]
pub(crate) fn select_tension(z0: f64, z1: f64, s0: f64, s1: f64, lo: f64, hi: f64) -> f64 {
    let tol = 1e-9 * (hi - lo).abs().max(1.0);
    let within = |sigma: f64| {
        let spline = TensionHermite::fit(z0, z1, s0, s1, sigma);
        (0..=TENSION_SAMPLES).all(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / TENSION_SAMPLES as f64;
            let v = spline.value(t);
            v >= lo - tol && v <= hi + tol
        })
    };

    if within(0.0) {
        return 0.0;
    }
    if !within(SIGMA_MAX) {
        return SIGMA_MAX;
    }
    let mut below: f64 = 0.0;
    let mut above = SIGMA_MAX;
    for _ in 0..TENSION_BISECTION_STEPS {
        let mid = below.midpoint(above);
        if within(mid) {
            above = mid;
        } else {
            below = mid;
        }
    }
    above
}

pub(crate) fn dot2(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// Left-hand perpendicular in a 2-D tangent basis.
const fn perp(v: [f64; 2]) -> [f64; 2] {
    [-v[1], v[0]]
}

/// Value, reconstructed gradient, and position at parameter `s` along the
/// tension spline of edge `a -> b`.
///
/// The gradient at the edge point combines the spline's tangential slope
/// with a linear blend of the endpoint gradients' cross-edge components,
/// expressed in the basis at the returned point.
pub(crate) fn edge_profile<D: Domain>(
    a: D::Point,
    b: D::Point,
    za: f64,
    zb: f64,
    ga: [f64; 2],
    gb: [f64; 2],
    sigma: f64,
    s: f64,
) -> (f64, [f64; 2], D::Point) {
    let edge_len = D::distance(a, b);
    let dir_start = D::direction_components(a, b);
    let dir_end_back = D::direction_components(b, a);
    let d_start = dot2(ga, dir_start) * edge_len;
    let d_end = -dot2(gb, dir_end_back) * edge_len;
    let spline = TensionHermite::fit(za, zb, d_start, d_end, sigma);
    let value = spline.value(s);
    let slope = spline.derivative(s);

    let q = D::point_on_edge(a, b, s);
    let mut tangent = D::direction_components(q, b);
    if tangent == [0.0, 0.0] {
        let back = D::direction_components(q, a);
        tangent = [-back[0], -back[1]];
    }
    let cross_start = dot2(ga, perp(dir_start));
    let cross_end = dot2(gb, perp([-dir_end_back[0], -dir_end_back[1]]));
    let cross = (1.0 - s).mul_add(cross_start, s * cross_end);
    let slope_per_len = if edge_len > f64::EPSILON {
        slope / edge_len
    } else {
        0.0
    };
    let normal = perp(tangent);
    let grad = [
        tangent[0].mul_add(slope_per_len, normal[0] * cross),
        tangent[1].mul_add(slope_per_len, normal[1] * cross),
    ];
    (value, grad, q)
}

/// Evaluates the order-3 side-vertex interpolant at barycentric position
/// `bary` inside a triangle.
///
/// `gradients` are per-vertex two-component gradients in each vertex's own
/// basis; `edge_sigma[k]` is the tension of the edge opposite corner `k`.
/// The tension of each radial spline blends its two flanking edge tensions
/// so the interpolant degenerates to the shared edge spline on every cell
/// boundary.
#[must_use]
pub(crate) fn blend_cubic<D: Domain>(
    corners: [D::Point; 3],
    values: [f64; 3],
    gradients: [[f64; 2]; 3],
    edge_sigma: [f64; 3],
    bary: [f64; 3],
) -> f64 {
    // At (or numerically at) a corner the answer is that corner's value
    for m in 0..3 {
        if bary[m] >= 1.0 - 1e-14 {
            return values[m];
        }
    }

    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for m in 0..3 {
        let n1 = (m + 1) % 3;
        let n2 = (m + 2) % 3;
        let denom = bary[n1] + bary[n2];
        if denom <= f64::EPSILON {
            continue;
        }
        let s = (bary[n2] / denom).clamp(0.0, 1.0);

        // Spline along the opposite edge n1 -> n2, with the gradient
        // reconstructed at the crossing point
        let (edge_value, grad_q, q) = edge_profile::<D>(
            corners[n1],
            corners[n2],
            values[n1],
            values[n2],
            gradients[n1],
            gradients[n2],
            edge_sigma[m],
            s,
        );

        // Radial spline from corner m through the query to q
        let radial_len = D::distance(corners[m], q);
        let value_m = if radial_len > f64::EPSILON {
            let d_m = dot2(gradients[m], D::direction_components(corners[m], q)) * radial_len;
            let back = D::direction_components(q, corners[m]);
            let d_q = -dot2(grad_q, back) * radial_len;
            let radial_sigma =
                (bary[n1] * edge_sigma[n2] + bary[n2] * edge_sigma[n1]) / denom;
            let radial = TensionHermite::fit(values[m], edge_value, d_m, d_q, radial_sigma);
            radial.value((1.0 - bary[m]).clamp(0.0, 1.0))
        } else {
            values[m]
        };

        let w = bary[m] * bary[m];
        weighted += w * value_m;
        weight_sum += w;
    }

    if weight_sum > 0.0 {
        weighted / weight_sum
    } else {
        // Query coincides with the opposite edge of every zero-weight
        // corner; fall back to the flat combination
        values[0] * bary[0] + values[1] * bary[1] + values[2] * bary[2]
    }
}
