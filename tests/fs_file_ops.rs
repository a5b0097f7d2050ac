//! write/read/chunking scenarios (spec.md section 8, concrete
//! scenarios 2, 3).

use std::sync::Arc;

use formicd::config::BLOCK_SIZE;
use formicd::fsops::{FilesystemOps, STATUS_OK};
use formicd::gateway::{MemoryGroupStore, MemoryValueStore};
use formicd::idgen::IdGen;

async fn new_ops() -> FilesystemOps {
    let ops = FilesystemOps::new(
        Arc::new(MemoryValueStore::new()),
        Arc::new(MemoryGroupStore::new()),
        Arc::new(IdGen::new(1, formicd::config::DEFAULT_EPOCH_UNIX_MS)),
    );
    ops.ensure_root().await.unwrap();
    ops
}

#[tokio::test]
async fn scenario_write_then_read_single_block() {
    let ops = new_ops().await;
    let attr = ops.create(1, "f").await.unwrap();

    let status = ops.write(attr.inode, 0, b"1234567890").await.unwrap();
    assert_eq!(status, STATUS_OK);

    let data = ops.read(attr.inode, 0, 10).await.unwrap();
    assert_eq!(data, b"1234567890");

    let (_, attr) = ops.lookup(1, "f").await.unwrap().unwrap();
    assert_eq!(attr.size, 10);
}

#[tokio::test]
async fn scenario_write_chunked_across_two_blocks() {
    let ops = new_ops().await;
    let attr = ops.create(1, "big").await.unwrap();

    let mut payload = vec![0u8; (BLOCK_SIZE as usize) + 123];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    let status = ops.write(attr.inode, 0, &payload).await.unwrap();
    assert_eq!(status, STATUS_OK);

    let (_, final_attr) = ops.lookup(1, "big").await.unwrap().unwrap();
    assert_eq!(final_attr.size, BLOCK_SIZE + 123);

    // Block 0 should hold exactly the first block_size bytes verbatim.
    let block0 = ops.read(attr.inode, 0, BLOCK_SIZE).await.unwrap();
    assert_eq!(block0, &payload[0..BLOCK_SIZE as usize]);
}

#[tokio::test]
async fn write_for_any_payload_up_to_block_size_sets_exact_size() {
    for len in [1usize, 7, 256, 4096] {
        let ops = new_ops().await;
        let attr = ops.create(1, "f").await.unwrap();
        let payload = vec![9u8; len];
        ops.write(attr.inode, 0, &payload).await.unwrap();
        let (_, attr) = ops.lookup(1, "f").await.unwrap().unwrap();
        assert_eq!(attr.size, len as u64);
    }
}

#[tokio::test]
async fn read_on_inode_with_no_content_is_empty() {
    let ops = new_ops().await;
    let attr = ops.create(1, "empty").await.unwrap();
    let data = ops.read(attr.inode, 0, 100).await.unwrap();
    assert!(data.is_empty());
}
