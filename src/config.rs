//! Configuration for the demonstration binary.
//!
//! The engine itself is configured through its API; this module only
//! shapes the `tsi` binary's command line: which domain to mesh, how many
//! vertices and queries to run, the interpolation order, and the seed.

use clap::{Parser, ValueEnum};

use crate::interp::spline::InterpOrder;

/// Embedding surface for the demo mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DomainKind {
    /// Scattered points in the Euclidean plane
    Planar,
    /// Points covering the unit sphere
    Spherical,
}

/// Command-line configuration for a demo interpolation run.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct InterpConfig {
    /// Embedding surface for the mesh
    #[arg(short, long, value_enum, default_value = "planar")]
    pub domain: DomainKind,

    /// Number of mesh vertices
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(3..))]
    pub vertices: u32,

    /// Number of query points
    #[arg(short, long, default_value = "1000", value_parser = clap::value_parser!(u32).range(1..))]
    pub queries: u32,

    /// Interpolation order: 0 (nearest), 1 (linear), or 3 (cubic tension)
    #[arg(short, long, default_value = "3")]
    pub order: u8,

    /// Seed for the point-set and query generators
    #[arg(long, default_value = "1729")]
    pub seed: u64,

    /// Side length of the planar extent (ignored on the sphere)
    #[arg(long, default_value = "10.0")]
    pub extent: f64,

    /// Also estimate and report nodal gradients
    #[arg(long, default_value = "false")]
    pub gradients: bool,
}

impl InterpConfig {
    /// Builds a configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Creates a configuration with defaults for everything but the mesh
    /// size.
    #[must_use]
    pub const fn new(domain: DomainKind, vertices: u32) -> Self {
        Self {
            domain,
            vertices,
            queries: 1000,
            order: 3,
            seed: 1729,
            extent: 10.0,
            gradients: false,
        }
    }

    /// The interpolation order selected on the command line.
    #[must_use]
    pub const fn interp_order(&self) -> Option<InterpOrder> {
        InterpOrder::from_selector(self.order)
    }

    /// Validates the configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns an error message if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices < 3 {
            return Err("Number of vertices must be at least 3".to_string());
        }
        if self.domain == DomainKind::Spherical && self.vertices < 4 {
            return Err("A spherical mesh needs at least 4 vertices".to_string());
        }
        if self.interp_order().is_none() {
            return Err(format!(
                "Unsupported order: {}. Use 0, 1, or 3.",
                self.order
            ));
        }
        if self.queries == 0 {
            return Err("Number of queries must be positive".to_string());
        }
        if self.extent <= 0.0 || !self.extent.is_finite() {
            return Err("Extent must be positive and finite".to_string());
        }
        Ok(())
    }
}

/// Configuration presets for tests and benchmarks.
#[derive(Debug, Clone)]
pub struct TestConfig;

impl TestConfig {
    /// Small, fast configuration suitable for unit tests.
    #[must_use]
    pub const fn small() -> InterpConfig {
        InterpConfig {
            domain: DomainKind::Planar,
            vertices: 24,
            queries: 50,
            order: 1,
            seed: 7,
            extent: 10.0,
            gradients: false,
        }
    }

    /// Medium configuration for integration tests.
    #[must_use]
    pub const fn medium() -> InterpConfig {
        InterpConfig {
            domain: DomainKind::Planar,
            vertices: 200,
            queries: 500,
            order: 3,
            seed: 7,
            extent: 10.0,
            gradients: true,
        }
    }

    /// Large configuration for performance measurement.
    #[must_use]
    pub const fn large() -> InterpConfig {
        InterpConfig {
            domain: DomainKind::Spherical,
            vertices: 2000,
            queries: 5000,
            order: 3,
            seed: 7,
            extent: 10.0,
            gradients: true,
        }
    }
}
