//! Structured logging setup.
//!
//! The reference kernel module (`log.rs`) hand-rolls a level filter and a
//! `[cpuN][pid=X][subsys]` line format because it has no allocator-backed
//! logging ecosystem to reach for. A userspace async service does, so this
//! carries the same "one filtered, leveled stream" shape using `tracing`
//! instead of reinventing it.

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber.
///
/// Honors `RUST_LOG` (default filter: `info`) and writes to stderr with
/// target + level, which is what a `journald`/supervisor captures by
/// default for a long-running daemon.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
