//! `TrackedItem`: the releasable handle returned by `TrackingGet`/
//! `TrackingSet`. While held it pins the item against eviction by
//! holding the `ref_count` above zero.

use super::item::Item;

/// A releasable handle to a (possibly absent) cache entry. Items referenced
/// by a live `TrackedItem` are skipped by `GC`; release it (or drop it)
/// once done.
pub struct TrackedItem<P, S, V> {
    item: Option<Item<P, S, V>>,
}

impl<P, S, V> TrackedItem<P, S, V> {
    pub(crate) fn some(item: Item<P, S, V>) -> Self {
        item.incr_ref();
        Self { item: Some(item) }
    }

    /// The "nil-tracked" sentinel: `TrackingGet`/`TrackingSet` never return
    /// `None` outright, they return this instead, so callers always have a
    /// releasable object.
    pub fn none() -> Self {
        Self { item: None }
    }

    pub fn is_present(&self) -> bool {
        self.item.is_some()
    }

    pub fn get(&self) -> Option<&Item<P, S, V>> {
        self.item.as_ref()
    }

    /// Releases the pin. Equivalent to dropping the handle.
    pub fn release(self) {}
}

impl<P, S, V> Drop for TrackedItem<P, S, V> {
    fn drop(&mut self) {
        if let Some(item) = &self.item {
            item.decr_ref();
        }
    }
}
