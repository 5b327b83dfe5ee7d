//! Result caching
//!
//! Harvest results are memoized in memory for a bounded time window. Keys
//! are derived deterministically from a content name and the call
//! arguments; values live in one expiring map per TTL so short-lived and
//! long-lived content never compete for the same capacity.

mod key;
mod store;

pub use key::{CacheKey, CacheKeyBuilder};
pub use store::CacheStore;
