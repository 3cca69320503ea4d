//! Default log setup for host applications.

use std::io;

use tracing_subscriber::EnvFilter;

use crate::errors::SeismomapError;

/// Install a stderr tracing subscriber.
///
/// `quiet` wins over `verbose`. Hosts with their own subscriber should not
/// call this.
///
/// # Errors
///
/// Returns `Telemetry` if a global subscriber is already set.
pub fn init_tracing(verbose: bool, quiet: bool) -> Result<(), SeismomapError> {
    tracing_subscriber::fmt()
        .with_env_filter(level_filter(verbose, quiet))
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| SeismomapError::Telemetry(e.to_string()))
}

fn level_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}
