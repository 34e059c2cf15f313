//! The maintainer: the single background actor
//! that owns the recency list and the aggregated size. Every mutation the
//! list or the size ever undergoes happens on this one thread.

use std::hash::Hash;
use std::sync::Arc;

use crossbeam_channel::{select, Receiver};

use crate::config::CacheConfig;
use crate::model::Item;
use crate::recency::RecencyList;
use crate::storage::ShardedMap;
use crate::weight::Weighted;

use super::messages::ControlMsg;

pub(crate) type OnDelete<P, S, V> = Arc<dyn Fn(&Item<P, S, V>) + Send + Sync>;

pub(crate) struct Maintainer<P, S, V> {
    recency: RecencyList<Item<P, S, V>>,
    size: i64,
    dropped: u64,
    max_size: i64,
    items_to_prune: usize,
    gets_per_promote: i32,
    tracking: bool,
    on_delete: Option<OnDelete<P, S, V>>,
    map: Arc<ShardedMap<P, S, V>>,
}

impl<P, S, V> Maintainer<P, S, V>
where
    P: Eq + Hash + Clone + Send + Sync + 'static,
    S: Eq + Hash + Clone + Send + Sync + 'static,
    V: Weighted + Send + Sync + 'static,
{
    pub(crate) fn new(map: Arc<ShardedMap<P, S, V>>, cfg: &CacheConfig, on_delete: Option<OnDelete<P, S, V>>) -> Self {
        Self {
            recency: RecencyList::new(),
            size: 0,
            dropped: 0,
            max_size: cfg.max_size,
            items_to_prune: cfg.items_to_prune,
            gets_per_promote: cfg.gets_per_promote,
            tracking: cfg.tracking,
            on_delete,
            map,
        }
    }

    /// The maintainer's main loop. Runs until a `ControlMsg::Stop` arrives
    /// or every sender is dropped, draining the other two queues before
    /// returning.
    pub(crate) fn run(
        mut self,
        promotions_rx: Receiver<Item<P, S, V>>,
        deletions_rx: Receiver<Item<P, S, V>>,
        control_rx: Receiver<ControlMsg>,
        tick_interval: Option<std::time::Duration>,
    ) {
        let ticker = tick_interval.map(crossbeam_channel::tick).unwrap_or_else(crossbeam_channel::never);

        'main: loop {
            select! {
                recv(promotions_rx) -> msg => match msg {
                    Ok(item) => self.on_promotion(item),
                    Err(_) => break 'main,
                },
                recv(deletions_rx) -> msg => match msg {
                    Ok(item) => self.on_deletion(item),
                    Err(_) => break 'main,
                },
                recv(control_rx) -> msg => match msg {
                    Ok(ctrl) => {
                        if self.on_control(ctrl, &promotions_rx, &deletions_rx) {
                            break 'main;
                        }
                    }
                    Err(_) => break 'main,
                },
                recv(ticker) -> _ => {
                    let evicted = self.evict(self.items_to_prune as u64);
                    self.dropped += evicted;
                }
            }
        }

        while let Ok(item) = promotions_rx.try_recv() {
            self.on_promotion(item);
        }
        while let Ok(item) = deletions_rx.try_recv() {
            self.on_deletion(item);
        }
        while let Ok(ctrl) = control_rx.try_recv() {
            self.on_control(ctrl, &promotions_rx, &deletions_rx);
        }

        tracing::info!(dropped = self.dropped, size = self.size, "maintainer stopped");
    }

    /// Promotion event.
    fn on_promotion(&mut self, item: Item<P, S, V>) {
        if item.is_tombstoned() {
            return;
        }

        match item.handle() {
            Some(id) => {
                let reps = item.increment_promotions();
                if reps >= self.gets_per_promote {
                    self.recency.move_to_front(id);
                    item.set_promotions(0);
                }
            }
            None => {
                self.size += item.size();
                let id = self.recency.push_front(item.clone());
                item.set_handle(id);

                if self.size > self.max_size {
                    let target = self.items_to_prune.max((self.size - self.max_size) as usize) as u64;
                    let evicted = self.evict(target);
                    self.dropped += evicted;
                }
            }
        }
    }

    /// Deletion event. A no-op if this exact instance already lost its
    /// handle, either because it was never admitted or because eviction
    /// already tore it down first.
    fn on_deletion(&mut self, item: Item<P, S, V>) {
        let Some(id) = item.handle() else {
            item.tombstone();
            return;
        };
        self.size -= item.size();
        self.recency.remove(id);
        item.clear_handle();
        item.tombstone();
        if let Some(cb) = &self.on_delete {
            cb(&item);
        }
    }

    /// Handles one control call. Returns `true` if the maintainer loop
    /// should stop after replying.
    fn on_control(&mut self, ctrl: ControlMsg, promotions_rx: &Receiver<Item<P, S, V>>, deletions_rx: &Receiver<Item<P, S, V>>) -> bool {
        match ctrl {
            ControlMsg::GetSize(reply) => {
                let _ = reply.send(self.size);
            }
            ControlMsg::GetDropped(reply) => {
                let d = self.dropped;
                self.dropped = 0;
                let _ = reply.send(d);
            }
            ControlMsg::SetMaxSize(n, reply) => {
                self.max_size = n;
                if self.size > self.max_size {
                    let target = self.items_to_prune.max((self.size - self.max_size) as usize) as u64;
                    self.dropped += self.evict(target);
                }
                let _ = reply.send(());
            }
            ControlMsg::Gc(reply) => {
                let evicted = self.evict(self.items_to_prune as u64);
                self.dropped += evicted;
                let _ = reply.send(evicted);
            }
            ControlMsg::Clear(reply) => {
                for item in self.map.clear() {
                    item.clear_handle();
                    item.tombstone();
                }
                self.recency.clear();
                self.size = 0;
                let _ = reply.send(());
            }
            ControlMsg::SyncUpdates(reply) => {
                while let Ok(item) = promotions_rx.try_recv() {
                    self.on_promotion(item);
                }
                while let Ok(item) = deletions_rx.try_recv() {
                    self.on_deletion(item);
                }
                let _ = reply.send(());
            }
            ControlMsg::Stop(reply) => {
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    /// Eviction. Walks tail -> head; skips (without evicting)
    /// items pinned by a positive `ref_count` when tracking is enabled.
    /// Returns the number of items evicted.
    fn evict(&mut self, target: u64) -> u64 {
        let mut evicted = 0u64;
        let mut visited = 0usize;
        let bound = self.recency.len();
        let mut cursor = self.recency.peek_tail();

        while evicted < target {
            let Some(id) = cursor else { break };
            if visited >= bound {
                break;
            }
            visited += 1;

            let item = match self.recency.item(id) {
                Some(it) => it.clone(),
                None => break,
            };
            let next_cursor = self.recency.prev_of(id);

            if self.tracking && item.ref_count() > 0 {
                cursor = next_cursor;
                continue;
            }

            self.recency.remove(id);
            self.size -= item.size();
            item.clear_handle();
            item.tombstone();

            // Only fire on_delete if this pass is the one that actually
            // removed the entry from storage; a concurrent Set/Delete may
            // have already replaced or removed it.
            let removed = self.map.shard_for(item.primary()).delete_if_same_instance(item.primary(), item.secondary(), &item);
            if removed.is_some() {
                if let Some(cb) = &self.on_delete {
                    cb(&item);
                }
            }
            evicted += 1;
            cursor = next_cursor;
        }

        if evicted > 0 {
            tracing::debug!(evicted, remaining_size = self.size, max_size = self.max_size, "eviction pass");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::storage::ShardedMap;

    impl Weighted for i64 {
        fn weight(&self) -> i64 {
            *self
        }
    }

    fn maintainer(max_size: i64, items_to_prune: usize, gets_per_promote: i32, tracking: bool) -> Maintainer<&'static str, String, i64> {
        let cfg = CacheConfig {
            max_size,
            items_to_prune,
            gets_per_promote,
            tracking,
            ..CacheConfig::default()
        };
        Maintainer::new(Arc::new(ShardedMap::new(cfg.buckets)), &cfg, None)
    }

    #[test]
    fn first_promotion_admits_and_adds_weight() {
        let mut m = maintainer(1000, 1, 3, false);
        let item = Item::new("p", "s".to_string(), 10i64, 10, i64::MAX);
        m.on_promotion(item.clone());
        assert_eq!(m.size, 10);
        assert!(item.handle().is_some());
    }

    #[test]
    fn promotions_below_threshold_accumulate_without_moving() {
        let mut m = maintainer(1000, 1, 3, false);
        let item = Item::new("p", "s".to_string(), 10i64, 10, i64::MAX);
        m.on_promotion(item.clone()); // admits, promotions stays 0
        assert_eq!(item.promotions(), 0);
        m.on_promotion(item.clone());
        assert_eq!(item.promotions(), 1);
        m.on_promotion(item.clone());
        assert_eq!(item.promotions(), 2);
        m.on_promotion(item.clone()); // trips gets_per_promote=3, resets
        assert_eq!(item.promotions(), 0);
    }

    #[test]
    fn deletion_before_first_promotion_tombstones_without_touching_size() {
        let mut m = maintainer(1000, 1, 3, false);
        let item = Item::new("p", "s".to_string(), 10i64, 10, i64::MAX);
        m.on_deletion(item.clone());
        assert!(item.is_tombstoned());
        assert_eq!(m.size, 0);
    }

    #[test]
    fn deletion_after_promotion_reclaims_weight_and_unlinks() {
        let mut m = maintainer(1000, 1, 3, false);
        let item = Item::new("p", "s".to_string(), 10i64, 10, i64::MAX);
        m.on_promotion(item.clone());
        assert_eq!(m.size, 10);
        m.on_deletion(item.clone());
        assert_eq!(m.size, 0);
        assert!(item.handle().is_none());
        assert!(item.is_tombstoned());
    }

    #[test]
    fn eviction_walks_tail_first_and_stops_at_target() {
        let mut m = maintainer(1000, 1, 3, false);
        let mut items = Vec::new();
        for n in 0..5 {
            let (item, _) = m.map.shard_for(&"p").set(&"p", format!("s{n}"), 10i64, i64::MAX, 0);
            m.on_promotion(item.clone());
            items.push(item);
        }
        assert_eq!(m.size, 50);

        let evicted = m.evict(2);
        assert_eq!(evicted, 2);
        assert_eq!(m.size, 30);
        // the two oldest (tail-most) items are gone.
        assert!(items[0].is_tombstoned());
        assert!(items[1].is_tombstoned());
        assert!(!items[2].is_tombstoned());
    }

    #[test]
    fn tracking_skips_pinned_items_during_eviction() {
        let mut m = maintainer(1000, 5, 3, true);
        let (oldest, _) = m.map.shard_for(&"p").set(&"p", "pinned".to_string(), 10i64, i64::MAX, 0);
        m.on_promotion(oldest.clone());
        oldest.incr_ref();

        for n in 0..3 {
            let (item, _) = m.map.shard_for(&"p").set(&"p", format!("s{n}"), 10i64, i64::MAX, 0);
            m.on_promotion(item.clone());
        }

        let evicted = m.evict(4);
        assert_eq!(evicted, 3, "the pinned item must be skipped, not counted towards target");
        assert!(!oldest.is_tombstoned());
    }
}
