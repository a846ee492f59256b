//! Coordinate types for the planar and spherical domains.
//!
//! Planar points are plain `(x, y)` pairs. Spherical points are unit
//! 3-vectors; constructors accept longitude/latitude in degrees or radians
//! and conversions back are provided for callers that work in angular form.

use serde::{Deserialize, Serialize};

/// A point in the Euclidean plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point2 {
    /// Creates a new planar point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A point on the unit sphere, stored as a unit 3-vector.
///
/// The longitude/latitude convention matches geographic use: longitude
/// increases eastward from the +x axis, latitude increases northward from
/// the equator toward +z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpherePoint {
    /// x component of the unit vector
    pub x: f64,
    /// y component of the unit vector
    pub y: f64,
    /// z component of the unit vector
    pub z: f64,
}

impl SpherePoint {
    /// Normalizes an arbitrary 3-vector onto the unit sphere.
    ///
    /// Returns `None` for the zero vector or non-finite input, which cannot
    /// designate a direction.
    #[must_use]
    pub fn normalized(x: f64, y: f64, z: f64) -> Option<Self> {
        let norm = (x * x + y * y + z * z).sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return None;
        }
        Some(Self {
            x: x / norm,
            y: y / norm,
            z: z / norm,
        })
    }

    /// Creates a sphere point from longitude and latitude in radians.
    #[must_use]
    pub fn from_lonlat_radians(lon: f64, lat: f64) -> Self {
        let (sin_lon, cos_lon) = lon.sin_cos();
        let (sin_lat, cos_lat) = lat.sin_cos();
        Self {
            x: cos_lat * cos_lon,
            y: cos_lat * sin_lon,
            z: sin_lat,
        }
    }

    /// Creates a sphere point from longitude and latitude in degrees.
    #[must_use]
    pub fn from_lonlat_degrees(lon: f64, lat: f64) -> Self {
        Self::from_lonlat_radians(lon.to_radians(), lat.to_radians())
    }

    /// Returns `(longitude, latitude)` in radians.
    #[must_use]
    pub fn to_lonlat_radians(self) -> (f64, f64) {
        let lon = self.y.atan2(self.x);
        let lat = self.z.clamp(-1.0, 1.0).asin();
        (lon, lat)
    }

    /// Returns `(longitude, latitude)` in degrees.
    #[must_use]
    pub fn to_lonlat_degrees(self) -> (f64, f64) {
        let (lon, lat) = self.to_lonlat_radians();
        (lon.to_degrees(), lat.to_degrees())
    }

    /// Returns true if all components are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Components as an array.
    #[must_use]
    pub const fn as_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Dot product with another sphere point.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Great-circle angle (geodesic distance on the unit sphere) to another
    /// point, computed with `atan2` for accuracy at small separations.
    #[must_use]
    pub fn angle_to(self, other: Self) -> f64 {
        let cross = cross3(self.as_array(), other.as_array());
        norm3(cross).atan2(self.dot(other))
    }

    /// Local orthonormal tangent frame `(east, north)` at this point.
    ///
    /// East points along increasing longitude, north along increasing
    /// latitude. At the poles, where longitude is undefined, the frame
    /// falls back to east = +x.
    #[must_use]
    pub fn tangent_frame(self) -> ([f64; 3], [f64; 3]) {
        let horiz = self.x.hypot(self.y);
        let east = if horiz < 1e-14 {
            [1.0, 0.0, 0.0]
        } else {
            [-self.y / horiz, self.x / horiz, 0.0]
        };
        let north = cross3(self.as_array(), east);
        (east, north)
    }
}

/// Dot product of two 3-vectors.
#[must_use]
pub(crate) fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3-vectors.
#[must_use]
pub(crate) fn cross3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean norm of a 3-vector.
#[must_use]
pub(crate) fn norm3(a: [f64; 3]) -> f64 {
    dot3(a, a).sqrt()
}
