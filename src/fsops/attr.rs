//! `getattr`/`setattr` (spec.md section 4.4).

use tracing::instrument;

use super::model::{Attr, InodeEntry};
use super::FilesystemOps;
use crate::error::Result;

/// Which fields of `setattr`'s request are actually applied — the
/// request carries "a bitset of which fields to apply" per spec.md
/// section 4.4; this struct is the internal, wire-agnostic form of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetAttrRequest {
    pub mode: Option<u32>,
    pub size: Option<u64>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub atime: Option<i64>,
    pub mtime: Option<i64>,
}

impl FilesystemOps {
    /// Reads `K(inode)`, unmarshals `InodeEntry`, returns `attr`. A
    /// missing entry returns `None` here; the RPC layer is responsible
    /// for encoding that as the zero-valued wire reply (spec.md section 9).
    #[instrument(skip(self))]
    pub async fn getattr(&self, inode: u64) -> Result<Option<Attr>> {
        self.metrics.getattr.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(self.load_entry(inode).await?.map(|entry| entry.attr))
    }

    /// Read-modify-write of `InodeEntry` per `request`'s bitset. If `size`
    /// is set and the current size is zero, `blocks`/`last_block` reset
    /// to zero (truncation beyond that is undefined by the core).
    #[instrument(skip(self, request))]
    pub async fn setattr(&self, inode: u64, request: SetAttrRequest) -> Result<Option<Attr>> {
        self.metrics.setattr.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Some(mut entry) = self.load_entry(inode).await? else {
            return Ok(None);
        };
        apply_setattr(&mut entry, request);
        self.store_entry(&entry).await?;
        Ok(Some(entry.attr))
    }
}

fn apply_setattr(entry: &mut InodeEntry, request: SetAttrRequest) {
    if let Some(mode) = request.mode {
        entry.attr.mode = mode;
    }
    if let Some(size) = request.size {
        if entry.attr.size == 0 {
            entry.blocks = 0;
            entry.last_block = 0;
        }
        entry.attr.size = size;
    }
    if let Some(uid) = request.uid {
        entry.attr.uid = uid;
    }
    if let Some(gid) = request.gid {
        entry.attr.gid = gid;
    }
    if let Some(atime) = request.atime {
        entry.attr.atime = atime;
    }
    if let Some(mtime) = request.mtime {
        entry.attr.mtime = mtime;
    }
}

#[cfg(test)]
mod tests {
    use super::super::new_test_ops;
    use super::*;

    #[tokio::test]
    async fn getattr_on_missing_inode_is_none() {
        let ops = new_test_ops();
        assert!(ops.getattr(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn getattr_returns_root_attr() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        let attr = ops.getattr(1).await.unwrap().unwrap();
        assert_eq!(attr.mode & 0o777, 0o777);
    }

    #[tokio::test]
    async fn setattr_resets_blocks_when_growing_from_zero() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        let req = SetAttrRequest { size: Some(4096), ..Default::default() };
        let attr = ops.setattr(1, req).await.unwrap().unwrap();
        assert_eq!(attr.size, 4096);
    }

    #[tokio::test]
    async fn setattr_on_missing_inode_is_none() {
        let ops = new_test_ops();
        let req = SetAttrRequest { uid: Some(42), ..Default::default() };
        assert!(ops.setattr(999, req).await.unwrap().is_none());
    }
}
