//! Structured logging through `tracing`.
//!
//! Logs go to stderr so stdout stays free for the progress display. The
//! filter comes from `SIMUGEN_LOG` when set, otherwise `simugen=info`
//! (`simugen=debug` when verbose).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SIMUGEN_LOG";

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "simugen=debug" } else { "simugen=info" }
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
