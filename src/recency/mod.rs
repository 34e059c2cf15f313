//! The global recency list.
//!
//! Owned exclusively by the maintainer; shards only ever read an item's
//! handle to route a deletion, never to walk or mutate the list itself.

mod list;

pub use list::{NodeId, RecencyList, NONE};
