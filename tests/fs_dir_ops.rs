//! create/lookup/readdir/remove/rename scenarios (spec.md section 8,
//! concrete scenarios 1, 4, 5, 6).

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
async fn scenario_create_then_lookup() {
    let ops = new_ops().await;
    let attr = ops.create(1, "foo").await.unwrap();
    assert_eq!(attr.mode & 0o777, 0o777);

    let (name, looked_up) = ops.lookup(1, "foo").await.unwrap().unwrap();
    assert_eq!(name, "foo");
    assert_eq!(looked_up.inode, attr.inode);

    let listing = ops.readdir(1).await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].name, "foo");
    assert!(listing.dirs.is_empty());
}

#[tokio::test]
async fn scenario_mkdir_then_nested_create() {
    let ops = new_ops().await;
    let dir_attr = ops.mkdir(1, "d").await.unwrap();
    let file_attr = ops.create(dir_attr.inode, "f").await.unwrap();

    let root_listing = ops.readdir(1).await.unwrap();
    assert_eq!(root_listing.dirs[0].name, "d");

    let nested_listing = ops.readdir(dir_attr.inode).await.unwrap();
    assert_eq!(nested_listing.files[0].name, "f");
    assert_eq!(nested_listing.files[0].attr.inode, file_attr.inode);
}

#[tokio::test]
async fn scenario_rename() {
    let ops = new_ops().await;
    let attr = ops.create(1, "a").await.unwrap();
    ops.rename(1, "a", 1, "b").await.unwrap();

    assert!(ops.lookup(1, "a").await.unwrap().is_none());
    let (name, looked_up) = ops.lookup(1, "b").await.unwrap().unwrap();
    assert_eq!(name, "b");
    assert_eq!(looked_up.inode, attr.inode);
}

#[tokio::test]
async fn scenario_symlink_then_readlink() {
    let ops = new_ops().await;
    let attr = ops.symlink(1, "l", "/target").await.unwrap();
    assert_eq!(attr.size, 8);

    let target = ops.readlink(attr.inode).await.unwrap();
    assert_eq!(target.as_deref(), Some("/target"));
}

#[tokio::test]
async fn remove_then_lookup_is_none_and_remove_is_idempotent() {
    let ops = new_ops().await;
    ops.create(1, "a").await.unwrap();
    ops.remove(1, "a").await.unwrap();
    ops.remove(1, "a").await.unwrap();
    assert!(ops.lookup(1, "a").await.unwrap().is_none());
}

#[tokio::test]
async fn rename_onto_an_existing_name_fails() {
    let ops = new_ops().await;
    ops.create(1, "a").await.unwrap();
    ops.create(1, "b").await.unwrap();
    let err = ops.rename(1, "a", 1, "b").await.unwrap_err();
    assert!(matches!(err, formicd::error::ServerError::AlreadyExists(_)));
}
