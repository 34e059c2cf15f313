//! `SecondaryCacheHandle`: a view of one primary key's secondary bucket,
//! returned by `Cache::get_or_create_secondary_cache`. Lets a caller that
//! already knows its primary key skip re-hashing and re-routing it on every
//! subsequent operation.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::model::Item;
use crate::storage::SecondaryBucket;
use crate::time::now_nanos;
use crate::weight::Weighted;

pub struct SecondaryCacheHandle<P, S, V> {
    pub(crate) primary: P,
    pub(crate) bucket: Arc<SecondaryBucket<P, S, V>>,
    pub(crate) promote_tx: Sender<Item<P, S, V>>,
    pub(crate) delete_tx: Sender<Item<P, S, V>>,
}

impl<P, S, V> SecondaryCacheHandle<P, S, V>
where
    P: Clone,
    S: Eq + Hash + Clone,
    V: Weighted,
{
    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn get(&self, secondary: &S) -> Option<Item<P, S, V>> {
        let item = self.bucket.get(secondary)?;
        if !item.is_expired(now_nanos()) {
            let _ = self.promote_tx.try_send(item.clone());
        }
        Some(item)
    }

    pub fn get_without_promote(&self, secondary: &S) -> Option<Item<P, S, V>> {
        self.bucket.get(secondary)
    }

    pub fn set(&self, secondary: S, value: V, ttl: Duration) -> Item<P, S, V> {
        let now = now_nanos();
        let (item, prior) = self.bucket.set(secondary, value, ttl.as_nanos() as i64, now);
        if let Some(old) = prior {
            let _ = self.delete_tx.send(old);
        }
        let _ = self.promote_tx.send(item.clone());
        item
    }

    pub fn delete(&self, secondary: &S) -> bool {
        match self.bucket.delete(secondary) {
            Some(item) => {
                let _ = self.delete_tx.send(item);
                true
            }
            None => false,
        }
    }

    pub fn delete_prefix(&self, prefix: &str) -> usize
    where
        S: AsRef<str>,
    {
        let mut sink = Vec::new();
        let n = self.bucket.delete_prefix(prefix, &mut sink);
        for item in sink {
            let _ = self.delete_tx.send(item);
        }
        n
    }

    pub fn delete_func<F>(&self, pred: F) -> usize
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        let mut sink = Vec::new();
        let n = self.bucket.delete_func(pred, &mut sink);
        for item in sink {
            let _ = self.delete_tx.send(item);
        }
        n
    }

    pub fn for_each_func<F>(&self, pred: F)
    where
        F: FnMut(&S, &Item<P, S, V>) -> bool,
    {
        self.bucket.for_each_func(pred);
    }

    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
