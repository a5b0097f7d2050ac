//! `read`/`write` (spec.md section 4.4). Two deliberate fidelity points
//! are preserved exactly, not "fixed": `read` only ever looks at block 0
//! regardless of `offset`/`size`, and `write`'s read-modify-write for a
//! partial chunk overlays the new bytes from buffer offset 0 rather than
//! from `offset % block_size`.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::instrument;

use super::{FilesystemOps, STATUS_ERROR, STATUS_OK};
use crate::config::BLOCK_SIZE;
use crate::error::Result;
use crate::keys;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs() as i64
}

impl FilesystemOps {
    /// Reads `K(inode, 0)` verbatim. Multi-block reads, and any use of
    /// `offset`/`size`, are out of the core's contract — the kernel
    /// adapter is expected to treat short or absent blocks as sparse-file
    /// zero-fill (spec.md section 4.4).
    #[instrument(skip(self))]
    pub async fn read(&self, inode: u64, _offset: u64, _size: u64) -> Result<Vec<u8>> {
        self.metrics.read.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let key = keys::derive_default(inode, 0);
        self.values.get_chunk(key).await
    }

    /// Chunks `payload` at `block_size` boundaries starting at
    /// `offset / block_size`, writing each chunk to `K(inode, block)` and
    /// updating `InodeEntry` bookkeeping after every successful chunk.
    /// Stops at the first failing chunk, leaving prior writes in place,
    /// and reports that as `STATUS_ERROR` rather than an RPC-level error
    /// (spec.md section 4.4).
    #[instrument(skip(self, payload))]
    pub async fn write(&self, inode: u64, offset: u64, payload: &[u8]) -> Result<i32> {
        self.metrics.write.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Some(mut entry) = self.load_entry(inode).await? else {
            return Ok(STATUS_ERROR);
        };

        let b = BLOCK_SIZE;
        let start_block = offset / b;

        for (i, chunk) in payload.chunks(b as usize).enumerate() {
            let block = start_block + i as u64;
            let key = keys::derive_default(inode, block);

            let outcome = self.write_one_chunk(key, chunk).await;
            let sent_size = match outcome {
                Ok(sent_size) => sent_size,
                Err(_) => return Ok(STATUS_ERROR),
            };

            if block >= entry.blocks {
                entry.blocks = block + 1;
                entry.last_block = sent_size;
                entry.block_size = b;
                entry.attr.size = b * block + sent_size;
            } else if block == entry.blocks - 1 {
                entry.last_block = sent_size;
                entry.attr.size = b * block + sent_size;
            }
            entry.attr.mtime = now_secs();

            if self.store_entry(&entry).await.is_err() {
                return Ok(STATUS_ERROR);
            }
        }

        Ok(STATUS_OK)
    }

    /// Writes one chunk, merging with the existing block first if this
    /// chunk is short — current core limitation: the merge overlays from
    /// buffer offset 0, not from `offset % block_size`. Returns the
    /// number of bytes actually sent in this chunk's request.
    async fn write_one_chunk(&self, key: crate::keys::Key, chunk: &[u8]) -> Result<u64> {
        let b = BLOCK_SIZE as usize;
        let data = if chunk.len() < b {
            let mut merged = self.values.get_chunk(key).await?;
            if merged.len() < chunk.len() {
                merged.resize(chunk.len(), 0);
            }
            merged[..chunk.len()].copy_from_slice(chunk);
            merged
        } else {
            chunk.to_vec()
        };
        let sent_size = chunk.len() as u64;
        self.values.put_chunk(key, data).await?;
        Ok(sent_size)
    }
}

#[cfg(test)]
mod tests {
    use super::super::new_test_ops;
    use super::*;

    #[tokio::test]
    async fn write_then_read_single_block() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        ops.create(1, "f.txt").await.unwrap();
        let (_, attr) = ops.lookup(1, "f.txt").await.unwrap().unwrap();
        let status = ops.write(attr.inode, 0, b"hello world").await.unwrap();
        assert_eq!(status, STATUS_OK);
        let data = ops.read(attr.inode, 0, 11).await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn write_updates_size_and_blocks() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        ops.create(1, "f.txt").await.unwrap();
        let (_, attr) = ops.lookup(1, "f.txt").await.unwrap().unwrap();
        ops.write(attr.inode, 0, b"abc").await.unwrap();
        let (_, attr) = ops.lookup(1, "f.txt").await.unwrap().unwrap();
        assert_eq!(attr.size, 3);
    }

    #[tokio::test]
    async fn write_spanning_two_blocks_chunks_correctly() {
        let ops = new_test_ops();
        ops.ensure_root().await.unwrap();
        ops.create(1, "big.bin").await.unwrap();
        let (_, attr) = ops.lookup(1, "big.bin").await.unwrap().unwrap();
        let payload = vec![7u8; (BLOCK_SIZE as usize) + 100];
        let status = ops.write(attr.inode, 0, &payload).await.unwrap();
        assert_eq!(status, STATUS_OK);
        let (_, attr) = ops.lookup(1, "big.bin").await.unwrap().unwrap();
        assert_eq!(attr.size, BLOCK_SIZE + 100);
    }

    #[tokio::test]
    async fn read_on_missing_inode_content_is_empty() {
        let ops = new_test_ops();
        let data = ops.read(42, 0, 10).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn write_on_missing_inode_is_status_error() {
        let ops = new_test_ops();
        let status = ops.write(999, 0, b"x").await.unwrap();
        assert_eq!(status, STATUS_ERROR);
    }
}
