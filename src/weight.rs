//! The weight contract values stored in the cache must satisfy: a
//! non-negative integer weight contributed to the aggregated size.

/// Supplies the weight an item contributes towards the cache's size bound.
pub trait Weighted {
    fn weight(&self) -> i64;
}
