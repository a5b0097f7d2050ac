//! `getxattr`/`setxattr`/`listxattr`/`removexattr` (spec.md section 4.4).
//! All four are read-modify-write of `InodeEntry.xattr`.

use tracing::instrument;

use super::FilesystemOps;
use crate::error::Result;

impl FilesystemOps {
    #[instrument(skip(self))]
    pub async fn getxattr(&self, inode: u64, name: &str) -> Result<Vec<u8>> {
        self.metrics.xattr.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Some(entry) = self.load_entry(inode).await? else {
            return Ok(Vec::new());
        };
        Ok(entry.xattr.get(name).cloned().unwrap_or_default())
    }

    #[instrument(skip(self, value))]
    pub async fn setxattr(&self, inode: u64, name: &str, value: Vec<u8>) -> Result<()> {
        self.metrics.xattr.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Some(mut entry) = self.load_entry(inode).await? else {
            return Ok(());
        };
        entry.xattr.insert(name.to_string(), value);
        self.store_entry(&entry).await
    }

    /// All names concatenated with `\x00` separators, including a
    /// trailing `\x00` after the last name (spec.md section 4.4).
    #[instrument(skip(self))]
    pub async fn listxattr(&self, inode: u64) -> Result<Vec<u8>> {
        self.metrics.xattr.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Some(entry) = self.load_entry(inode).await? else {
            return Ok(Vec::new());
        };
        let mut names: Vec<&str> = entry.xattr.keys().map(String::as_str).collect();
        names.sort_unstable();
        let mut out = Vec::new();
        for name in names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn removexattr(&self, inode: u64, name: &str) -> Result<()> {
        self.metrics.xattr.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Some(mut entry) = self.load_entry(inode).await? else {
            return Ok(());
        };
        entry.xattr.remove(name);
        self.store_entry(&entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::new_test_ops;

    #[tokio::test]
    async fn setxattr_then_getxattr_roundtrips() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        ops.setxattr(1, "user.tag", b"v1".to_vec()).await.unwrap();
        assert_eq!(ops.getxattr(1, "user.tag").await.unwrap(), b"v1");
    }

    #[tokio::test]
    async fn getxattr_missing_name_is_empty() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        assert!(ops.getxattr(1, "nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listxattr_joins_sorted_names_with_trailing_nul() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        ops.setxattr(1, "b", b"2".to_vec()).await.unwrap();
        ops.setxattr(1, "a", b"1".to_vec()).await.unwrap();
        let listed = ops.listxattr(1).await.unwrap();
        assert_eq!(listed, b"a\0b\0");
    }

    #[tokio::test]
    async fn removexattr_drops_the_entry() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        ops.setxattr(1, "a", b"1".to_vec()).await.unwrap();
        ops.removexattr(1, "a").await.unwrap();
        assert!(ops.getxattr(1, "a").await.unwrap().is_empty());
    }
}
