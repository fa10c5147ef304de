//! Structured logging configuration.
//!
//! The codec itself only emits `tracing` events; embedding applications own
//! the subscriber. These helpers cover the common case of a binary that just
//! wants `RUST_LOG`-controlled output.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Install a formatting subscriber at a fixed maximum level.
pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
