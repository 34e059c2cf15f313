//! Layered shard: one of N independent
//! partitions of the primary-key space, each a `{primary -> secondary
//! bucket}` map guarded by its own lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::Item;
use crate::weight::Weighted;

use super::bucket::SecondaryBucket;

pub(crate) struct Shard<P, S, V> {
    buckets: RwLock<HashMap<P, Arc<SecondaryBucket<P, S, V>>>>,
}

impl<P, S, V> Shard<P, S, V>
where
    P: Eq + Hash + Clone,
    S: Eq + Hash + Clone,
    V: Weighted,
{
    pub(crate) fn new() -> Self {
        Self { buckets: RwLock::new(HashMap::new()) }
    }

    pub(crate) fn get(&self, primary: &P, secondary: &S) -> Option<Item<P, S, V>> {
        self.get_secondary_bucket(primary)?.get(secondary)
    }

    pub(crate) fn get_secondary_bucket(&self, primary: &P) -> Option<Arc<SecondaryBucket<P, S, V>>> {
        self.buckets.read().get(primary).cloned()
    }

    /// Returns the bucket for `primary`, creating it if absent. Never
    /// overwrites a bucket a racing writer already installed.
    pub(crate) fn get_or_create(&self, primary: &P) -> Arc<SecondaryBucket<P, S, V>> {
        if let Some(bucket) = self.get_secondary_bucket(primary) {
            return bucket;
        }
        self.buckets
            .write()
            .entry(primary.clone())
            .or_insert_with(|| Arc::new(SecondaryBucket::new(primary.clone())))
            .clone()
    }

    pub(crate) fn set(&self, primary: &P, secondary: S, value: V, ttl_nanos: i64, now_nanos: i64) -> (Item<P, S, V>, Option<Item<P, S, V>>) {
        self.get_or_create(primary).set(secondary, value, ttl_nanos, now_nanos)
    }

    pub(crate) fn delete(&self, primary: &P, secondary: &S) -> Option<Item<P, S, V>> {
        self.get_secondary_bucket(primary)?.delete(secondary)
    }

    /// See [`SecondaryBucket::delete_if_same_instance`].
    pub(crate) fn delete_if_same_instance(&self, primary: &P, secondary: &S, item: &Item<P, S, V>) -> Option<Item<P, S, V>> {
        self.get_secondary_bucket(primary)?.delete_if_same_instance(secondary, item)
    }

    /// Removes the whole bucket for `primary`. Returns whether it existed,
    /// pushing every item it held into `sink`.
    pub(crate) fn delete_all(&self, primary: &P, sink: &mut Vec<Item<P, S, V>>) -> bool {
        let removed = self.buckets.write().remove(primary);
        match removed {
            Some(bucket) => {
                sink.extend(bucket.drain_all());
                true
            }
            None => false,
        }
    }

    pub(crate) fn delete_prefix(&self, primary: &P, prefix: &str, sink: &mut Vec<Item<P, S, V>>) -> usize
    where
        S: AsRef<str>,
    {
        match self.get_secondary_bucket(primary) {
            Some(bucket) => bucket.delete_prefix(prefix, sink),
            None => 0,
        }
    }

    pub(crate) fn delete_func<F>(&self, primary: &P, pred: F, sink: &mut Vec<Item<P, S, V>>) -> usize
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        match self.get_secondary_bucket(primary) {
            Some(bucket) => bucket.delete_func(pred, sink),
            None => 0,
        }
    }

    pub(crate) fn for_each_func<F>(&self, primary: &P, pred: F)
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        if let Some(bucket) = self.get_secondary_bucket(primary) {
            bucket.for_each_func(pred);
        }
    }

    pub(crate) fn item_count(&self) -> usize {
        self.buckets.read().values().map(|b| b.len()).sum()
    }

    /// Drops every bucket, returning every item they held.
    pub(crate) fn clear(&self) -> Vec<Item<P, S, V>> {
        let buckets: Vec<_> = std::mem::take(&mut *self.buckets.write()).into_values().collect();
        buckets.into_iter().flat_map(|b| b.drain_all()).collect()
    }
}
