//! Secondary bucket: a `{secondary -> Item}`
//! mapping guarded by its own lock, installed under one primary key.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::model::Item;
use crate::weight::Weighted;

pub(crate) struct SecondaryBucket<P, S, V> {
    primary: P,
    entries: RwLock<HashMap<S, Item<P, S, V>>>,
}

impl<P, S, V> SecondaryBucket<P, S, V>
where
    P: Clone,
    S: Eq + Hash + Clone,
    V: Weighted,
{
    pub(crate) fn new(primary: P) -> Self {
        Self { primary, entries: RwLock::new(HashMap::new()) }
    }

    pub(crate) fn get(&self, secondary: &S) -> Option<Item<P, S, V>> {
        self.entries.read().get(secondary).cloned()
    }

    /// Builds a fresh `Item` and installs it, returning it alongside
    /// whatever it replaced.
    pub(crate) fn set(&self, secondary: S, value: V, ttl_nanos: i64, now_nanos: i64) -> (Item<P, S, V>, Option<Item<P, S, V>>) {
        let weight = value.weight();
        let item = Item::new(self.primary.clone(), secondary.clone(), value, weight, now_nanos.saturating_add(ttl_nanos));
        let prior = self.entries.write().insert(secondary, item.clone());
        (item, prior)
    }

    pub(crate) fn delete(&self, secondary: &S) -> Option<Item<P, S, V>> {
        self.entries.write().remove(secondary)
    }

    /// Removes `secondary` only if its current occupant is still `item`,
    /// not merely an entry with equal keys.
    pub(crate) fn delete_if_same_instance(&self, secondary: &S, item: &Item<P, S, V>) -> Option<Item<P, S, V>> {
        let mut guard = self.entries.write();
        if guard.get(secondary).is_some_and(|current| current.is_same_instance(item)) {
            guard.remove(secondary)
        } else {
            None
        }
    }

    /// Removes every entry whose secondary key begins with `prefix`,
    /// pushing each removed item into `sink`. Returns the count removed.
    pub(crate) fn delete_prefix(&self, prefix: &str, sink: &mut Vec<Item<P, S, V>>) -> usize
    where
        S: AsRef<str>,
    {
        let mut guard = self.entries.write();
        let matching: Vec<S> = guard.keys().filter(|k| k.as_ref().starts_with(prefix)).cloned().collect();
        let count = matching.len();
        for key in matching {
            if let Some(item) = guard.remove(&key) {
                sink.push(item);
            }
        }
        count
    }

    /// Removes every entry for which `pred` holds. Returns the count removed.
    pub(crate) fn delete_func<F>(&self, mut pred: F, sink: &mut Vec<Item<P, S, V>>) -> usize
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        let mut guard = self.entries.write();
        let matching: Vec<S> = guard.iter().filter(|(k, v)| pred(k, v)).map(|(k, _)| k.clone()).collect();
        let count = matching.len();
        for key in matching {
            if let Some(item) = guard.remove(&key) {
                sink.push(item);
            }
        }
        count
    }

    /// Iterates a consistent snapshot under the lock until `pred` returns
    /// false.
    pub(crate) fn for_each_func<F>(&self, mut pred: F)
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        let guard = self.entries.read();
        for (k, v) in guard.iter() {
            if !pred(k, v) {
                break;
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Drains every entry, returning them all. Used when the whole bucket
    /// is being torn down (`DeleteAll`, `Clear`).
    pub(crate) fn drain_all(&self) -> Vec<Item<P, S, V>> {
        self.entries.write().drain().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Weighted for u32 {
        fn weight(&self) -> i64 {
            1
        }
    }

    #[test]
    fn set_returns_prior_item_on_replace() {
        let bucket: SecondaryBucket<&str, &str, u32> = SecondaryBucket::new("u/1");
        let (first, prior) = bucket.set(".json", 1, 1_000, 0);
        assert!(prior.is_none());
        let (second, prior) = bucket.set(".json", 2, 1_000, 0);
        assert!(prior.is_some());
        assert!(!first.is_same_instance(&second));
    }

    #[test]
    fn delete_prefix_only_matches_prefix() {
        let bucket: SecondaryBucket<&str, &str, u32> = SecondaryBucket::new("u/1");
        bucket.set(".json", 1, 1_000, 0);
        bucket.set(".xml", 1, 1_000, 0);
        bucket.set(".json.gz", 1, 1_000, 0);
        let mut sink = Vec::new();
        let n = bucket.delete_prefix(".json", &mut sink);
        assert_eq!(n, 2);
        assert_eq!(bucket.len(), 1);
        assert!(bucket.get(&".xml").is_some());
    }

    #[test]
    fn delete_func_removes_matching_and_keeps_rest() {
        let bucket: SecondaryBucket<&str, &str, u32> = SecondaryBucket::new("u/1");
        bucket.set(".a", 1, 1_000, 0);
        bucket.set(".b", 2, 1_000, 0);
        let mut sink = Vec::new();
        let n = bucket.delete_func(|_, item| *item.value() == 2, &mut sink);
        assert_eq!(n, 1);
        assert_eq!(bucket.len(), 1);
        assert!(bucket.get(&".a").is_some());
    }
}
