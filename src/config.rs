//! Ambient configuration: logging initialization and the environment
//! variables this crate consults (SPEC_FULL §10.1, §10.3).
//!
//! `RUST_LOG` controls verbosity (defaulting to `info`); everything goes
//! to stderr so stdout stays reserved for protocol/hook output.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber once, at process start.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
