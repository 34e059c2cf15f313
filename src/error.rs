//! Error types for construction and for `Fetch` callback propagation.

use thiserror::Error;

/// Errors rejected at construction time: bad configuration is a construction
/// contract violation, not a runtime failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("buckets must be a non-zero power of two, got {0}")]
    BucketsNotPowerOfTwo(usize),

    #[error("promote_buffer must be non-zero")]
    ZeroPromoteBuffer,

    #[error("delete_buffer must be non-zero")]
    ZeroDeleteBuffer,

    #[error("gets_per_promote must be at least 1")]
    ZeroGetsPerPromote,

    #[error("items_to_prune must be at least 1")]
    ZeroItemsToPrune,
}

/// Wraps a `Fetch` callback failure. The cache never fails its own
/// operations; this only carries the caller's error through.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct FetchError<E>(#[from] pub E);
