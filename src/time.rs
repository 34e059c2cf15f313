//! Monotonic clock for expiry comparisons. No ticker to refresh a cached
//! value, unlike the teacher's `shared::time`: there's no async runtime
//! here to drive one, and `Instant::now()` is already a vDSO read.

use std::time::Instant;

use once_cell::sync::Lazy;

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Nanoseconds elapsed since this process first called into the cache.
/// Monotonic, not wall-clock: expiry is only ever compared against values
/// produced by this same function.
pub(crate) fn now_nanos() -> i64 {
    START.elapsed().as_nanos() as i64
}
