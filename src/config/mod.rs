//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Construction-time options for a [`crate::Cache`].
///
/// Validated by [`CacheConfig::validate`] rather than panicking: bad config
/// is a construction contract violation, not a runtime failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Shard count. Must be a power of two; routing reduces to a mask.
    pub buckets: usize,
    /// Eviction bound, in the caller's weight units.
    pub max_size: i64,
    /// Minimum number of items evicted per eviction pass.
    pub items_to_prune: usize,
    /// Number of `Get`s before a promoted item's counter trips a move-to-front.
    pub gets_per_promote: i32,
    /// Capacity of the promotions queue. Overflow is dropped, never blocks.
    pub promote_buffer: usize,
    /// Capacity of the deletions queue. Overflow must not occur in correct
    /// operation; size generously.
    pub delete_buffer: usize,
    /// Enables refcount-aware eviction and `TrackingGet`/`TrackingSet`.
    pub tracking: bool,
    /// When set, the maintainer runs an unprompted `GC` pass on this
    /// cadence in addition to the size-triggered and explicit ones.
    #[serde(default, with = "humantime_serde::option")]
    pub tick_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let buckets = (num_cpus::get() * 2).next_power_of_two().max(16);
        Self {
            buckets,
            max_size: 64 << 20,
            items_to_prune: 16,
            gets_per_promote: 3,
            promote_buffer: 4096,
            delete_buffer: 4096,
            tracking: false,
            tick_interval: None,
        }
    }
}

impl CacheConfig {
    /// Checks the construction contract.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets == 0 || !self.buckets.is_power_of_two() {
            return Err(ConfigError::BucketsNotPowerOfTwo(self.buckets));
        }
        if self.promote_buffer == 0 {
            return Err(ConfigError::ZeroPromoteBuffer);
        }
        if self.delete_buffer == 0 {
            return Err(ConfigError::ZeroDeleteBuffer);
        }
        if self.gets_per_promote < 1 {
            return Err(ConfigError::ZeroGetsPerPromote);
        }
        if self.items_to_prune == 0 {
            return Err(ConfigError::ZeroItemsToPrune);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_buckets() {
        let cfg = CacheConfig { buckets: 17, ..CacheConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::BucketsNotPowerOfTwo(17)));
    }

    #[test]
    fn rejects_zero_promote_buffer() {
        let cfg = CacheConfig { promote_buffer: 0, ..CacheConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPromoteBuffer));
    }
}
