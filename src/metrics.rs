//! Server-wide request metrics.
//!
//! Tracks per-verb call counts and conflict/timeout counts using atomic
//! counters, in the spirit of the reference kernel's `SystemMetrics` (a
//! flat struct of `AtomicU64`s, cheap to update from any task without a
//! lock). There's no `/proc/stat` here, so `snapshot()` is the export path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counters for the Filesystem Operations verbs.
#[derive(Default)]
pub struct Metrics {
    pub getattr: AtomicU64,
    pub setattr: AtomicU64,
    pub lookup: AtomicU64,
    pub readdir: AtomicU64,
    pub create: AtomicU64,
    pub mkdir: AtomicU64,
    pub remove: AtomicU64,
    pub rename: AtomicU64,
    pub symlink: AtomicU64,
    pub readlink: AtomicU64,
    pub read: AtomicU64,
    pub write: AtomicU64,
    pub xattr: AtomicU64,
    pub conflicts: AtomicU64,
    pub timeouts: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            getattr: AtomicU64::new(0),
            setattr: AtomicU64::new(0),
            lookup: AtomicU64::new(0),
            readdir: AtomicU64::new(0),
            create: AtomicU64::new(0),
            mkdir: AtomicU64::new(0),
            remove: AtomicU64::new(0),
            rename: AtomicU64::new(0),
            symlink: AtomicU64::new(0),
            readlink: AtomicU64::new(0),
            read: AtomicU64::new(0),
            write: AtomicU64::new(0),
            xattr: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of every counter, for a diagnostics endpoint
    /// or a periodic log line.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            getattr: load(&self.getattr),
            setattr: load(&self.setattr),
            lookup: load(&self.lookup),
            readdir: load(&self.readdir),
            create: load(&self.create),
            mkdir: load(&self.mkdir),
            remove: load(&self.remove),
            rename: load(&self.rename),
            symlink: load(&self.symlink),
            readlink: load(&self.readlink),
            read: load(&self.read),
            write: load(&self.write),
            xattr: load(&self.xattr),
            conflicts: load(&self.conflicts),
            timeouts: load(&self.timeouts),
        }
    }
}

/// Owned snapshot of [`Metrics`], safe to log or serialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub getattr: u64,
    pub setattr: u64,
    pub lookup: u64,
    pub readdir: u64,
    pub create: u64,
    pub mkdir: u64,
    pub remove: u64,
    pub rename: u64,
    pub symlink: u64,
    pub readlink: u64,
    pub read: u64,
    pub write: u64,
    pub xattr: u64,
    pub conflicts: u64,
    pub timeouts: u64,
}
