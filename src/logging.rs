//! Log output for the binaries.

use tracing_subscriber::EnvFilter;

/// Installs a compact stderr subscriber. The level comes from `RUST_LOG`
/// when set, else `default_level`. Calling it twice is harmless.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
