//! Logging setup for the pipeline binaries.
//!
//! Installs a global tracing subscriber that writes to stdout. The default
//! level is `info`; override with `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Initialize tracing output. Subsequent calls are no-ops.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
