//! Key Derivation: deterministic mapping from filesystem identifiers to the
//! 128-bit keys used by the value store and group store (spec.md section
//! 4.1). There is no central index anywhere in this system — derivation is
//! the *only* addressing mechanism, so every caller must agree to the bit.
//!
//! This is a direct, bit-faithful port of the reference implementation's
//! `apiServer.GetID`, which hashes big-endian `custID ‖ shareID ‖ inode ‖
//! block` through `murmur3.New128()` and splits the 128-bit sum into two
//! big-endian `u64` halves.

use std::io::Cursor;

/// Multi-tenancy is reserved but hard-wired in the current core.
pub const DEFAULT_CUST_ID: u64 = 1;
pub const DEFAULT_SHARE_ID: u64 = 1;

/// A 128-bit store key, represented as two big-endian `u64` halves — the
/// shape both the value-store and group-store wire protocols expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub a: u64,
    pub b: u64,
}

impl Key {
    pub const fn new(a: u64, b: u64) -> Self {
        Key { a, b }
    }

    fn from_hash(hash: u128) -> Self {
        Key {
            a: (hash >> 64) as u64,
            b: hash as u64,
        }
    }

    /// Encode as 16 big-endian bytes, e.g. to store one key as another
    /// record's opaque value (directory membership rows store the child's
    /// inode key this way).
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..8].copy_from_slice(&self.a.to_be_bytes());
        out[8..16].copy_from_slice(&self.b.to_be_bytes());
        out
    }

    /// Decode 16 big-endian bytes produced by [`Key::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 16 {
            return None;
        }
        let a = u64::from_be_bytes(bytes[0..8].try_into().ok()?);
        let b = u64::from_be_bytes(bytes[8..16].try_into().ok()?);
        Some(Key { a, b })
    }
}

/// `K(custID, shareID, inode, block)`: the value-store/chunk key for block
/// `block` of `inode` under tenant `(custID, shareID)`.
pub fn derive(cust_id: u64, share_id: u64, inode: u64, block: u64) -> Key {
    let mut buf = [0u8; 32];
    buf[0..8].copy_from_slice(&cust_id.to_be_bytes());
    buf[8..16].copy_from_slice(&share_id.to_be_bytes());
    buf[16..24].copy_from_slice(&inode.to_be_bytes());
    buf[24..32].copy_from_slice(&block.to_be_bytes());
    Key::from_hash(hash128(&buf))
}

/// Shorthand for [`derive`] using the hard-wired tenant `(1, 1)`.
pub fn derive_default(inode: u64, block: u64) -> Key {
    derive(DEFAULT_CUST_ID, DEFAULT_SHARE_ID, inode, block)
}

/// `hash128(name)`: the group-store member key for a directory entry name.
/// Uses the same hash, seeded identically, over the name's UTF-8 bytes.
pub fn hash_name(name: &str) -> Key {
    Key::from_hash(hash128(name.as_bytes()))
}

/// Non-cryptographic 128-bit hash, seed zero, matching the reference's
/// `murmur3.New128()` (MurmurHash3 x64 128-bit variant).
fn hash128(bytes: &[u8]) -> u128 {
    murmur3::murmur3_x64_128(&mut Cursor::new(bytes), 0)
        .expect("hashing an in-memory byte slice cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let k1 = derive(1, 1, 42, 0);
        let k2 = derive(1, 1, 42, 0);
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_blocks_derive_different_keys() {
        let k0 = derive_default(7, 0);
        let k1 = derive_default(7, 1);
        assert_ne!(k0, k1);
    }

    #[test]
    fn different_inodes_derive_different_keys() {
        let a = derive_default(1, 0);
        let b = derive_default(2, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn name_hash_is_deterministic_and_distinct() {
        let a = hash_name("foo");
        let b = hash_name("foo");
        let c = hash_name("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn key_byte_roundtrip() {
        let k = derive_default(123, 4);
        let bytes = k.to_bytes();
        assert_eq!(Key::from_bytes(&bytes), Some(k));
    }
}
