//! The `Cache` façade: the only type most callers ever touch. Routes reads
//! and writes straight to the sharded storage, and pushes every promotion,
//! deletion, and control call onto the maintainer's queues.

use std::hash::Hash;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};

use crate::config::CacheConfig;
use crate::error::{ConfigError, FetchError};
use crate::handle::SecondaryCacheHandle;
use crate::maintainer::{ControlMsg, Maintainer};
use crate::model::{Item, TrackedItem};
use crate::storage::ShardedMap;
use crate::time::now_nanos;
use crate::weight::Weighted;

/// A concurrent, size-bounded, two-level cache keyed by a primary key (the
/// shard/bucket key) and a secondary key (the entry within that bucket).
///
/// Cheap to clone: a clone shares the same shards and the same background
/// maintainer. Drop the last handle, or call [`Cache::stop`], to shut the
/// maintainer thread down.
pub struct Cache<P, S, V> {
    map: Arc<ShardedMap<P, S, V>>,
    promote_tx: Sender<Item<P, S, V>>,
    delete_tx: Sender<Item<P, S, V>>,
    control_tx: Sender<ControlMsg>,
    maintainer_thread: Arc<parking_lot::Mutex<Option<JoinHandle<()>>>>,
    tracking: bool,
}

impl<P, S, V> Clone for Cache<P, S, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            promote_tx: self.promote_tx.clone(),
            delete_tx: self.delete_tx.clone(),
            control_tx: self.control_tx.clone(),
            maintainer_thread: self.maintainer_thread.clone(),
            tracking: self.tracking,
        }
    }
}

impl<P, S, V> Cache<P, S, V>
where
    P: Eq + Hash + Clone + Send + Sync + 'static,
    S: Eq + Hash + Clone + Send + Sync + 'static,
    V: Weighted + Send + Sync + 'static,
{
    /// Builds a cache from `cfg`, rejecting it up front if it violates the
    /// construction contract. No per-item delete callback is installed.
    pub fn new(cfg: CacheConfig) -> Result<Self, ConfigError> {
        Self::with_on_delete(cfg, None)
    }

    /// Like [`Cache::new`], but `on_delete` is invoked by the maintainer
    /// thread for every item that leaves the cache, whether by explicit
    /// delete or by eviction.
    pub fn with_on_delete(cfg: CacheConfig, on_delete: Option<Arc<dyn Fn(&Item<P, S, V>) + Send + Sync>>) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let map = Arc::new(ShardedMap::new(cfg.buckets));
        let (promote_tx, promote_rx) = bounded(cfg.promote_buffer);
        let (delete_tx, delete_rx) = bounded(cfg.delete_buffer);
        let (control_tx, control_rx) = bounded(0);

        let maintainer = Maintainer::new(map.clone(), &cfg, on_delete);
        let tick_interval = cfg.tick_interval;
        let thread = std::thread::Builder::new()
            .name("cache-maintainer".into())
            .spawn(move || maintainer.run(promote_rx, delete_rx, control_rx, tick_interval))
            .expect("failed to spawn maintainer thread");

        Ok(Self {
            map,
            promote_tx,
            delete_tx,
            control_tx,
            maintainer_thread: Arc::new(parking_lot::Mutex::new(Some(thread))),
            tracking: cfg.tracking,
        })
    }

    /// Reads an entry and, if present and not expired, enqueues a
    /// best-effort promotion. May return an expired item; callers that
    /// care must check [`Item::is_expired`] themselves.
    pub fn get(&self, primary: &P, secondary: &S) -> Option<Item<P, S, V>> {
        let item = self.map.shard_for(primary).get(primary, secondary)?;
        if !item.is_expired(now_nanos()) {
            let _ = self.promote_tx.try_send(item.clone());
        }
        Some(item)
    }

    /// Like [`Cache::get`] but never touches the promotions queue.
    pub fn get_without_promote(&self, primary: &P, secondary: &S) -> Option<Item<P, S, V>> {
        self.map.shard_for(primary).get(primary, secondary)
    }

    /// Installs `value` under `(primary, secondary)` with the given TTL.
    /// The prior occupant, if any, is scheduled for deletion; the new item
    /// is scheduled for admission into the recency list. Both enqueues
    /// block if the corresponding queue is full, guaranteeing the item's
    /// eventual admission is not silently dropped.
    pub fn set(&self, primary: &P, secondary: S, value: V, ttl: Duration) -> Item<P, S, V> {
        let now = now_nanos();
        let (item, prior) = self.map.shard_for(primary).set(primary, secondary, value, ttl.as_nanos() as i64, now);
        if let Some(old) = prior {
            let _ = self.delete_tx.send(old);
        }
        let _ = self.promote_tx.send(item.clone());
        item
    }

    /// If `(primary, secondary)` is absent, does nothing and returns
    /// `false`. Otherwise replaces the value in place, re-using the
    /// existing item's remaining TTL rather than a fresh one.
    pub fn replace(&self, primary: &P, secondary: S, value: V) -> bool {
        let shard = self.map.shard_for(primary);
        let existing = match shard.get(primary, &secondary) {
            Some(existing) => existing,
            None => return false,
        };
        let now = now_nanos();
        let remaining_ttl = existing.remaining_ttl_nanos(now);
        let (item, prior) = shard.set(primary, secondary, value, remaining_ttl, now);
        if let Some(old) = prior {
            let _ = self.delete_tx.send(old);
        }
        let _ = self.promote_tx.send(item);
        true
    }

    /// Returns the current entry if present and unexpired; otherwise calls
    /// `load` and installs its result with `ttl`. Propagates `load`'s error
    /// without installing anything.
    pub fn fetch<F, E>(&self, primary: &P, secondary: &S, ttl: Duration, load: F) -> Result<Item<P, S, V>, FetchError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(item) = self.get(primary, secondary) {
            if !item.is_expired(now_nanos()) {
                return Ok(item);
            }
        }
        let value = load().map_err(FetchError)?;
        Ok(self.set(primary, secondary.clone(), value, ttl))
    }

    /// Removes a single entry. Returns whether it existed.
    pub fn delete(&self, primary: &P, secondary: &S) -> bool {
        match self.map.shard_for(primary).delete(primary, secondary) {
            Some(item) => {
                let _ = self.delete_tx.send(item);
                true
            }
            None => false,
        }
    }

    /// Removes every entry under `primary`, whole bucket included. Returns
    /// whether the bucket existed.
    pub fn delete_all(&self, primary: &P) -> bool {
        let mut sink = Vec::new();
        let existed = self.map.shard_for(primary).delete_all(primary, &mut sink);
        for item in sink {
            let _ = self.delete_tx.send(item);
        }
        existed
    }

    /// Removes every entry under `primary` whose secondary key starts with
    /// `prefix`. Returns the count removed.
    pub fn delete_prefix(&self, primary: &P, prefix: &str) -> usize
    where
        S: AsRef<str>,
    {
        let mut sink = Vec::new();
        let n = self.map.shard_for(primary).delete_prefix(primary, prefix, &mut sink);
        for item in sink {
            let _ = self.delete_tx.send(item);
        }
        n
    }

    /// Removes every entry under `primary` for which `pred` holds. Returns
    /// the count removed.
    pub fn delete_func<F>(&self, primary: &P, pred: F) -> usize
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        let mut sink = Vec::new();
        let n = self.map.shard_for(primary).delete_func(primary, pred, &mut sink);
        for item in sink {
            let _ = self.delete_tx.send(item);
        }
        n
    }

    /// Iterates the entries under `primary` in an unspecified order until
    /// `pred` returns `false`. The whole call runs under the bucket's read
    /// lock; keep `pred` cheap.
    pub fn for_each_func<F>(&self, primary: &P, pred: F)
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        self.map.shard_for(primary).for_each_func(primary, pred);
    }

    /// Returns a handle scoped to `primary`'s secondary bucket, creating it
    /// if absent. Cheaper than repeated `get`/`set` calls against the same
    /// primary key, since the bucket lookup happens once.
    pub fn get_or_create_secondary_cache(&self, primary: &P) -> SecondaryCacheHandle<P, S, V> {
        let bucket = self.map.shard_for(primary).get_or_create(primary);
        SecondaryCacheHandle {
            primary: primary.clone(),
            bucket,
            promote_tx: self.promote_tx.clone(),
            delete_tx: self.delete_tx.clone(),
        }
    }

    /// Reads an entry and pins it against eviction for as long as the
    /// returned handle is held. Requires `tracking` to have been enabled at
    /// construction; otherwise the pin is a no-op against an eviction pass
    /// that never consults `ref_count`.
    pub fn tracking_get(&self, primary: &P, secondary: &S) -> TrackedItem<P, S, V> {
        debug_assert!(self.tracking, "tracking_get called on a cache built without tracking enabled");
        match self.get(primary, secondary) {
            Some(item) => TrackedItem::some(item),
            None => TrackedItem::none(),
        }
    }

    /// Like [`Cache::set`], but returns a pinned handle to the new item
    /// instead of the bare item.
    pub fn tracking_set(&self, primary: &P, secondary: S, value: V, ttl: Duration) -> TrackedItem<P, S, V> {
        debug_assert!(self.tracking, "tracking_set called on a cache built without tracking enabled");
        TrackedItem::some(self.set(primary, secondary, value, ttl))
    }

    /// Total number of live entries across every shard. Best-effort: a
    /// concurrent writer can make this stale the instant it's returned.
    pub fn item_count(&self) -> usize {
        self.map.item_count()
    }

    /// The maintainer's current view of aggregated size.
    pub fn get_size(&self) -> i64 {
        self.control(ControlMsg::GetSize)
    }

    /// Items evicted since the last call to `get_dropped`. Resets the
    /// counter on read.
    pub fn get_dropped(&self) -> u64 {
        self.control(ControlMsg::GetDropped)
    }

    /// Changes the eviction bound, running an immediate eviction pass if
    /// the new bound is already exceeded.
    pub fn set_max_size(&self, max_size: i64) {
        self.control(|reply| ControlMsg::SetMaxSize(max_size, reply))
    }

    /// Forces an eviction pass of at least `items_to_prune` items (fewer if
    /// the list is shorter, or if every remaining item is pinned). Returns
    /// the number evicted.
    pub fn gc(&self) -> u64 {
        self.control(ControlMsg::Gc)
    }

    /// Drops every entry in every shard and resets the recency list and
    /// aggregated size to empty.
    pub fn clear(&self) {
        self.control(ControlMsg::Clear)
    }

    /// Blocks until the maintainer has drained every promotion and
    /// deletion enqueued by this call's caller up to this point. Useful in
    /// tests that need `get_size`/`item_count` to reflect a just-issued
    /// write.
    pub fn sync_updates(&self) {
        self.control(ControlMsg::SyncUpdates)
    }

    /// Shuts the maintainer thread down and waits for it to exit. Safe to
    /// call on any clone; subsequent calls on any clone are no-ops. Further
    /// reads and writes on other clones keep working against the sharded
    /// storage, but no further promotion, eviction, or control call is
    /// serviced once this returns.
    pub fn stop(&self) {
        let mut slot = self.maintainer_thread.lock();
        if let Some(handle) = slot.take() {
            self.control(ControlMsg::Stop);
            let _ = handle.join();
        }
    }

    fn control<T, F>(&self, build: F) -> T
    where
        F: FnOnce(Sender<T>) -> ControlMsg,
    {
        let (reply_tx, reply_rx) = bounded(1);
        if self.control_tx.send(build(reply_tx)).is_err() {
            panic!("maintainer thread is not running");
        }
        reply_rx.recv().expect("maintainer dropped its reply channel")
    }
}
