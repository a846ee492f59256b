//! Demonstration binary for the interpolation engine.
//!
//! Builds a seeded mesh, interpolates an analytic field over a query
//! batch, and logs the resulting status counts and RMS error.

use triangulated_scattered_interpolation::{InterpConfig, run};

fn main() {
    // Initialize logging
    env_logger::init();

    let config = InterpConfig::from_args();
    if let Err(message) = config.validate() {
        log::error!("invalid configuration: {message}");
        std::process::exit(2);
    }

    match run(&config) {
        Ok(summary) => {
            log::info!(
                "interpolation run completed: {} values from {} cells",
                summary.interpolated + summary.extrapolated,
                summary.cells
            );
        }
        Err(e) => {
            log::error!("interpolation run failed: {e}");
            std::process::exit(1);
        }
    }
}
