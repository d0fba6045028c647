//! Log setup for the binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to whoever runs it. `RUST_LOG` (from the environment or `.env`) overrides
//! the default filter.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Builds the filter from `RUST_LOG`, falling back to `default`.
pub fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs a stderr formatter. Safe to call more than once; later calls
/// are ignored.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(DEFAULT_FILTER))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
