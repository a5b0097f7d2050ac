//! The value-store representation of an inode, distinct from the
//! `tonic`/`prost` wire types in [`crate::pb`] (spec.md section 3;
//! SPEC_FULL.md section 3).

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::BLOCK_SIZE;

/// Mode bits the reference stamps on new entries: `0777` plus a kind flag.
pub const MODE_DIR: u32 = 0o40000 | 0o777;
pub const MODE_SYMLINK: u32 = 0o120000 | 0o777;
pub const MODE_FILE: u32 = 0o777;

/// POSIX-style attributes carried by every [`InodeEntry`] (spec.md section 3).
/// Carries its own `inode` so the RPC layer can embed it directly in the
/// wire `Attr`/`DirEnt` messages without a second round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    pub inode: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub crtime: i64,
}

impl Attr {
    fn stamped(inode: u64, mode: u32, size: u64) -> Self {
        let now = now_secs();
        Attr { inode, mode, uid: 0, gid: 0, size, atime: now, mtime: now, ctime: now, crtime: now }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs() as i64
}

/// The persisted shape of one inode (spec.md section 3). Stored at
/// `K(inode)` in the value store, `serde`+`bincode` encoded — this is
/// never the wire representation seen by `rpc.rs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InodeEntry {
    pub inode: u64,
    /// Leaf name within its parent directory, not a full path.
    pub path: String,
    pub is_dir: bool,
    pub is_link: bool,
    /// Symlink target; empty unless `is_link`.
    pub target: String,
    pub attr: Attr,
    /// Highest block index + 1 that has ever been written.
    pub blocks: u64,
    /// Byte length of the highest-indexed block.
    pub last_block: u64,
    /// Chunk size used to write this file, fixed once it has content.
    pub block_size: u64,
    pub xattr: HashMap<String, Vec<u8>>,
}

impl InodeEntry {
    /// Build the root directory entry (inode 1), created once at
    /// server initialization (spec.md section 3 invariant: "Inode 1
    /// exists and is a directory after server initialization").
    pub fn root() -> Self {
        InodeEntry {
            inode: 1,
            path: String::new(),
            is_dir: true,
            is_link: false,
            target: String::new(),
            attr: Attr::stamped(1, MODE_DIR, 0),
            blocks: 0,
            last_block: 0,
            block_size: BLOCK_SIZE,
            xattr: HashMap::new(),
        }
    }

    pub fn new_file(inode: u64, path: String) -> Self {
        InodeEntry {
            inode,
            path,
            is_dir: false,
            is_link: false,
            target: String::new(),
            attr: Attr::stamped(inode, MODE_FILE, 0),
            blocks: 0,
            last_block: 0,
            block_size: BLOCK_SIZE,
            xattr: HashMap::new(),
        }
    }

    pub fn new_dir(inode: u64, path: String) -> Self {
        InodeEntry {
            inode,
            path,
            is_dir: true,
            is_link: false,
            target: String::new(),
            attr: Attr::stamped(inode, MODE_DIR, 0),
            blocks: 0,
            last_block: 0,
            block_size: BLOCK_SIZE,
            xattr: HashMap::new(),
        }
    }

    pub fn new_symlink(inode: u64, path: String, target: String) -> Self {
        let size = target.len() as u64;
        InodeEntry {
            inode,
            path,
            is_dir: false,
            is_link: true,
            target,
            attr: Attr::stamped(inode, MODE_SYMLINK, size),
            blocks: 0,
            last_block: 0,
            block_size: BLOCK_SIZE,
            xattr: HashMap::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("InodeEntry serialization cannot fail")
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bincode::deserialize(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_a_directory_with_inode_one() {
        let root = InodeEntry::root();
        assert_eq!(root.inode, 1);
        assert!(root.is_dir);
    }

    #[test]
    fn encode_decode_roundtrips() {
        let entry = InodeEntry::new_file(42, "leaf.txt".to_string());
        let bytes = entry.encode();
        let decoded = InodeEntry::decode(&bytes).unwrap();
        assert_eq!(entry, decoded);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(InodeEntry::decode(&[1, 2, 3]).is_none());
    }
}
