//! A concurrent, size-bounded, two-level in-memory cache.
//!
//! Entries are addressed by a primary key (which selects a shard and a
//! secondary bucket within it) and a secondary key (which selects an entry
//! within that bucket). Recency tracking and eviction are owned by a single
//! background thread, the maintainer, fed by bounded queues, so the hot
//! read/write path only ever takes a per-shard or per-bucket lock and never
//! touches the global recency list directly.
//!
//! ```no_run
//! use std::time::Duration;
//! use layercache::{Cache, CacheConfig, Weighted};
//!
//! struct Body(Vec<u8>);
//! impl Weighted for Body {
//!     fn weight(&self) -> i64 {
//!         self.0.len() as i64
//!     }
//! }
//!
//! let cache: Cache<String, String, Body> = Cache::new(CacheConfig::default()).unwrap();
//! cache.set(&"user/1".to_string(), "profile.json".to_string(), Body(vec![1, 2, 3]), Duration::from_secs(60));
//! let hit = cache.get(&"user/1".to_string(), &"profile.json".to_string());
//! assert!(hit.is_some());
//! cache.stop();
//! ```

mod cache;
mod config;
mod error;
mod handle;
mod hash;
mod maintainer;
mod model;
mod recency;
mod storage;
mod time;
mod weight;

pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{ConfigError, FetchError};
pub use handle::SecondaryCacheHandle;
pub use model::{Item, TrackedItem};
pub use weight::Weighted;
