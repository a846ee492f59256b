//! Error types for the interpolation engine.

/// Main error type for triangulation and interpolation operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpError {
    /// Fewer than three input points were supplied
    #[error("insufficient vertices: got {provided}, need at least 3")]
    InsufficientVertices {
        /// Number of points actually supplied
        provided: usize,
    },

    /// Two input points occupy the same coordinate
    #[error("duplicate point: vertex {index} coincides with vertex {duplicate_of}")]
    DuplicatePoint {
        /// Index of the later of the two coincident points
        index: usize,
        /// Index of the earlier point it collides with
        duplicate_of: usize,
    },

    /// Input geometry admits no valid triangulation
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// Why the point set cannot be triangulated
        reason: String,
    },

    /// Point location walked into a cycle without resolving
    #[error("point location failed after {steps} steps without resolving")]
    LocateFailed {
        /// Number of triangles visited before the cycle was detected
        steps: usize,
    },

    /// A field array does not match the triangulation's vertex count
    #[error("field length mismatch: triangulation has {expected} vertices, field has {provided}")]
    FieldLengthMismatch {
        /// Vertex count of the triangulation
        expected: usize,
        /// Length of the supplied field array
        provided: usize,
    },

    /// A single-query coordinate contains NaN or infinity
    #[error("query coordinate is not finite")]
    NonFiniteQuery,
}

/// Result type for triangulation and interpolation operations.
pub type InterpResult<T> = Result<T, InterpError>;
