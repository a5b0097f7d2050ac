//! Filesystem Operations: the public verbs (spec.md section 4.4), built
//! on top of the Storage Gateway and Inode ID Allocator. This module owns
//! all `InodeEntry` mutation; the gateway never interprets bytes.

pub mod attr;
pub mod dir;
pub mod file;
pub mod model;
pub mod xattr;

use std::sync::Arc;

use crate::error::Result;
use crate::gateway::{GroupStore, ValueStore};
use crate::idgen::IdGen;
use crate::keys::{self, Key};
use crate::metrics::Metrics;
use model::InodeEntry;

/// The directory-entry status code returned by `write`/`rename` wire
/// replies, per spec.md section 4.4 ("`{status:0}` on success,
/// `{status:1}` on any chunk failure").
pub const STATUS_OK: i32 = 0;
pub const STATUS_ERROR: i32 = 1;

/// Shared handle to the two stores, the id allocator, and request
/// counters, composed into every public verb. Cheap to clone (everything
/// inside is already `Arc`/atomic).
#[derive(Clone)]
pub struct FilesystemOps {
    values: Arc<dyn ValueStore>,
    groups: Arc<dyn GroupStore>,
    ids: Arc<IdGen>,
    pub metrics: Arc<Metrics>,
}

impl FilesystemOps {
    pub fn new(values: Arc<dyn ValueStore>, groups: Arc<dyn GroupStore>, ids: Arc<IdGen>) -> Self {
        FilesystemOps { values, groups, ids, metrics: Arc::new(Metrics::new()) }
    }

    /// Create the root directory entry if it is not already present.
    /// Idempotent: a second call on an already-initialized store is a
    /// harmless no-op (the write simply loses the timestamp race).
    pub async fn ensure_root(&self) -> Result<()> {
        let key = keys::derive_default(1, 0);
        let existing = self.values.get_chunk(key).await?;
        if existing.is_empty() {
            let root = InodeEntry::root();
            self.values.put_chunk(key, root.encode()).await.ok();
        }
        Ok(())
    }

    fn entry_key(inode: u64) -> Key {
        keys::derive_default(inode, 0)
    }

    async fn load_entry(&self, inode: u64) -> Result<Option<InodeEntry>> {
        let bytes = self.values.get_chunk(Self::entry_key(inode)).await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(InodeEntry::decode(&bytes))
    }

    async fn store_entry(&self, entry: &InodeEntry) -> Result<()> {
        self.values.put_chunk(Self::entry_key(entry.inode), entry.encode()).await
    }

    /// Fixed synthetic values (spec.md section 4.4): 1 EB total/free/
    /// available capacity at 4 KB blocks, 1 T inodes total/free.
    pub fn statfs(&self) -> StatfsResult {
        const BSIZE: u32 = 4096;
        const CAPACITY_BYTES: u64 = 1_000_000_000_000_000_000; // 1 EB
        StatfsResult {
            blocks: CAPACITY_BYTES / BSIZE as u64,
            bfree: CAPACITY_BYTES / BSIZE as u64,
            bavail: CAPACITY_BYTES / BSIZE as u64,
            files: 1_000_000_000_000, // 1 T
            ffree: 1_000_000_000_000,
            bsize: BSIZE,
            namelen: 256,
            frsize: BSIZE,
        }
    }
}

/// Synthetic capacity figures returned by [`FilesystemOps::statfs`].
#[derive(Debug, Clone, Copy)]
pub struct StatfsResult {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}


#[cfg(test)]
pub(crate) use test_support::new_test_ops;
