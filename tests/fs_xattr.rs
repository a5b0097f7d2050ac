//! xattr family (spec.md section 8: "listxattr after setxattr contains
//! k exactly once").

use std::sync::Arc;

use formicd::fsops::FilesystemOps;
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
async fn setxattr_then_listxattr_contains_name_exactly_once() {
    let ops = new_ops().await;
    let attr = ops.create(1, "f").await.unwrap();

    ops.setxattr(attr.inode, "user.tag", b"v".to_vec()).await.unwrap();
    let listed = ops.listxattr(attr.inode).await.unwrap();
    let count = listed.split(|&b| b == 0).filter(|s| s == b"user.tag").count();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn setxattr_twice_overwrites_not_duplicates() {
    let ops = new_ops().await;
    let attr = ops.create(1, "f").await.unwrap();
    ops.setxattr(attr.inode, "k", b"v1".to_vec()).await.unwrap();
    ops.setxattr(attr.inode, "k", b"v2".to_vec()).await.unwrap();
    assert_eq!(ops.getxattr(attr.inode, "k").await.unwrap(), b"v2");
    let listed = ops.listxattr(attr.inode).await.unwrap();
    assert_eq!(listed.split(|&b| b == 0).filter(|s| s == b"k").count(), 1);
}

#[tokio::test]
async fn removexattr_then_getxattr_is_empty() {
    let ops = new_ops().await;
    let attr = ops.create(1, "f").await.unwrap();
    ops.setxattr(attr.inode, "k", b"v".to_vec()).await.unwrap();
    ops.removexattr(attr.inode, "k").await.unwrap();
    assert!(ops.getxattr(attr.inode, "k").await.unwrap().is_empty());
}
