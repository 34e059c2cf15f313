//! The fixed-size array of shards, routed by hash of the primary key
//! Routing is stable for the life of the cache: a primary key always
//! lands on the same shard once constructed.

use std::hash::Hash;

use crate::hash::{hash_primary, shard_index};
use crate::model::Item;
use crate::weight::Weighted;

use super::shard::Shard;

pub(crate) struct ShardedMap<P, S, V> {
    shards: Vec<Shard<P, S, V>>,
    mask: u64,
}

impl<P, S, V> ShardedMap<P, S, V>
where
    P: Eq + Hash + Clone,
    S: Eq + Hash + Clone,
    V: Weighted,
{
    pub(crate) fn new(buckets: usize) -> Self {
        debug_assert!(buckets.is_power_of_two() && buckets > 0);
        let mut shards = Vec::with_capacity(buckets);
        for _ in 0..buckets {
            shards.push(Shard::new());
        }
        Self { shards, mask: (buckets - 1) as u64 }
    }

    /// The shard addressing `primary`. Stable for the life of the cache.
    pub(crate) fn shard_for(&self, primary: &P) -> &Shard<P, S, V> {
        let idx = shard_index(hash_primary(primary), self.mask);
        &self.shards[idx]
    }

    pub(crate) fn item_count(&self) -> usize {
        self.shards.iter().map(|s| s.item_count()).sum()
    }

    /// Drops every shard's contents, returning every item they held.
    pub(crate) fn clear(&self) -> Vec<Item<P, S, V>> {
        self.shards.iter().flat_map(|s| s.clear()).collect()
    }
}
