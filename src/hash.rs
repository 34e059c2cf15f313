//! Primary-key hashing and shard routing.

use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::Xxh3;

/// Fast non-cryptographic 64-bit hash of a primary key.
pub(crate) fn hash_primary<P: Hash + ?Sized>(primary: &P) -> u64 {
    let mut hasher = Xxh3::new();
    primary.hash(&mut hasher);
    hasher.finish()
}

/// Shard index for a primary-key hash given a power-of-two shard count mask.
#[inline]
pub(crate) fn shard_index(hash: u64, mask: u64) -> usize {
    (hash & mask) as usize
}
