//! The unit of storage.

use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use crate::recency::{NodeId, NONE};

/// Sentinel `promotions` value: "deleted, or never to be (re-)promoted"
/// ("Tombstone": a terminal, never-again-promoted state).
pub const TOMBSTONE: i32 = -2;

struct ItemInner<P, S, V> {
    primary: P,
    secondary: S,
    value: V,
    size: i64,
    expires_at_nanos: i64,
    handle: AtomicU32,
    promotions: AtomicI32,
    ref_count: AtomicI64,
}

/// A cache entry. Cheap to clone: clones share the same backing allocation
/// and so observe the same `handle`/`promotions`/`ref_count` state.
/// Keys/value/expiry are read-only after construction; `handle` is written
/// only by the maintainer; `promotions`/`ref_count` are atomic.
pub struct Item<P, S, V> {
    inner: Arc<ItemInner<P, S, V>>,
}

impl<P, S, V> Clone for Item<P, S, V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<P, S, V> Item<P, S, V> {
    pub fn new(primary: P, secondary: S, value: V, size: i64, expires_at_nanos: i64) -> Self {
        Self {
            inner: Arc::new(ItemInner {
                primary,
                secondary,
                value,
                size,
                expires_at_nanos,
                handle: AtomicU32::new(NONE),
                promotions: AtomicI32::new(0),
                ref_count: AtomicI64::new(0),
            }),
        }
    }

    pub fn primary(&self) -> &P {
        &self.inner.primary
    }

    pub fn secondary(&self) -> &S {
        &self.inner.secondary
    }

    pub fn value(&self) -> &V {
        &self.inner.value
    }

    pub fn size(&self) -> i64 {
        self.inner.size
    }

    pub fn expires_at_nanos(&self) -> i64 {
        self.inner.expires_at_nanos
    }

    pub fn is_expired(&self, now_nanos: i64) -> bool {
        now_nanos >= self.inner.expires_at_nanos
    }

    /// Remaining time-to-live relative to `now_nanos`, clamped to zero.
    /// Used by `Replace` to recompute a new item's expiry from the existing
    /// one's remaining TTL.
    pub fn remaining_ttl_nanos(&self, now_nanos: i64) -> i64 {
        (self.inner.expires_at_nanos - now_nanos).max(0)
    }

    /// Two `Item`s are "the same entry instance" iff they share the backing
    /// allocation, not merely equal keys.
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // --- recency-list handle: written only by the maintainer ---

    pub(crate) fn handle(&self) -> Option<NodeId> {
        let h = self.inner.handle.load(Ordering::Relaxed);
        if h == NONE { None } else { Some(h) }
    }

    pub(crate) fn set_handle(&self, id: NodeId) {
        self.inner.handle.store(id, Ordering::Relaxed);
    }

    pub(crate) fn clear_handle(&self) {
        self.inner.handle.store(NONE, Ordering::Relaxed);
    }

    // --- promotion counter: incremented only by the maintainer ---

    pub(crate) fn promotions(&self) -> i32 {
        self.inner.promotions.load(Ordering::Relaxed)
    }

    pub(crate) fn set_promotions(&self, n: i32) {
        self.inner.promotions.store(n, Ordering::Relaxed);
    }

    pub(crate) fn increment_promotions(&self) -> i32 {
        self.inner.promotions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn is_tombstoned(&self) -> bool {
        self.promotions() == TOMBSTONE
    }

    pub(crate) fn tombstone(&self) {
        self.set_promotions(TOMBSTONE);
    }

    // --- reference count: consulted by eviction when tracking is enabled ---

    pub fn ref_count(&self) -> i64 {
        self.inner.ref_count.load(Ordering::Relaxed)
    }

    pub(crate) fn incr_ref(&self) -> i64 {
        self.inner.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn decr_ref(&self) -> i64 {
        self.inner.ref_count.fetch_sub(1, Ordering::AcqRel) - 1
    }
}
