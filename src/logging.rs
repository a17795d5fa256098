//! Structured diagnostics. Guardian's own decisions are the product; this
//! module only wires `tracing` up so operators can turn on `RUST_LOG` to
//! see policy loads, compilation, and audit I/O without Guardian ever
//! writing anything but the JSON decision to stdout.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber once. Safe to call more
/// than once per process — later calls are no-ops if a subscriber is
/// already installed, which matters for the test binary that exercises
/// multiple CLI paths in one process.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
