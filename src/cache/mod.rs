//! In-memory status cache shared by all request handlers.
//!
//! This module provides a freshness-bounded cache that:
//! - Stores live streams and confirmed-offline markers per channel
//! - Applies one TTL uniformly to positive and negative entries
//! - Reports expired entries as stale instead of dropping them, so they can
//!   still be served when the upstream API is unavailable

mod entry;
mod store;

pub use entry::{CacheEntry, CacheLookup};
pub use store::{CacheStore, DEFAULT_TTL_SECS};
