//! Structured logging setup

use tracing_subscriber::EnvFilter;

/// Install a `tracing` fmt subscriber.
///
/// `RUST_LOG` wins over `default_directive` (e.g. `"expdash=info"`).
/// Calling this more than once is harmless; only the first call installs.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
