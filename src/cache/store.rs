//! Process-wide channel status cache.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::entry::{CacheEntry, CacheLookup};
use crate::twitch::Stream;

/// Default freshness window for both live and offline entries.
pub const DEFAULT_TTL_SECS: i64 = 60;

/// Freshness-bounded map from lowercased channel name to its last known status.
///
/// Constructed once per service and shared by handle. Entries are only
/// overwritten, never removed; staleness is checked lazily on lookup.
/// Each `DashMap` shard is locked for the duration of a single get or insert,
/// so a reader never observes a partially written entry.
#[derive(Debug)]
pub struct CacheStore {
  entries: DashMap<String, CacheEntry>,
  ttl: Duration,
}

impl CacheStore {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: DashMap::new(),
      ttl,
    }
  }

  /// Look up a channel, judging freshness against the current time.
  pub fn get(&self, key: &str) -> CacheLookup {
    self.get_at(key, Utc::now())
  }

  pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> CacheLookup {
    match self.entries.get(key) {
      Some(entry) if entry.is_fresh_at(now) => CacheLookup::Fresh(entry.clone()),
      Some(entry) => CacheLookup::Stale(entry.clone()),
      None => CacheLookup::Absent,
    }
  }

  /// Store an entry under its own key. Last writer wins.
  pub fn put(&self, entry: CacheEntry) {
    self.entries.insert(entry.key().to_string(), entry);
  }

  /// Record a channel as live for one TTL window starting now.
  pub fn record_live(&self, stream: Stream) {
    self.put(CacheEntry::live(stream, Utc::now() + self.ttl));
  }

  /// Record a channel as confirmed offline for one TTL window starting now.
  pub fn record_offline(&self, key: &str) {
    self.put(CacheEntry::offline(key, Utc::now() + self.ttl));
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(Duration::seconds(DEFAULT_TTL_SECS))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  fn stream(username: &str, viewers: u64) -> Stream {
    Stream {
      username: username.to_string(),
      display_name: username.to_string(),
      status: "playing".to_string(),
      game: "chess".to_string(),
      viewer_count: viewers,
      started_at: Utc::now(),
      thumbnail_url: None,
    }
  }

  #[test]
  fn test_get_returns_absent_for_unknown_key() {
    let cache = CacheStore::default();
    assert_eq!(cache.get("nobody"), CacheLookup::Absent);
    assert!(cache.is_empty());
  }

  #[test]
  fn test_recorded_live_entry_is_fresh() {
    let cache = CacheStore::default();
    cache.record_live(stream("alpha", 10));

    match cache.get("alpha") {
      CacheLookup::Fresh(entry) => {
        assert_eq!(entry.data().map(|s| s.viewer_count), Some(10));
        assert!(entry.expires_at() > Utc::now());
      }
      other => panic!("expected fresh entry, got {:?}", other),
    }
  }

  #[test]
  fn test_recorded_offline_entry_is_fresh_negative() {
    let cache = CacheStore::default();
    cache.record_offline("beta");

    let entry = cache.get("beta").entry().unwrap();
    assert!(entry.is_offline());
    assert!(cache.get("beta").is_fresh());
  }

  #[test]
  fn test_expired_entry_is_reported_stale_with_value() {
    let cache = CacheStore::default();
    let past = Utc::now() - Duration::seconds(1);
    cache.put(CacheEntry::live(stream("gamma", 3), past));

    match cache.get("gamma") {
      CacheLookup::Stale(entry) => assert_eq!(entry.data().unwrap().username, "gamma"),
      other => panic!("expected stale entry, got {:?}", other),
    }
  }

  #[test]
  fn test_freshness_is_evaluated_at_lookup_time() {
    let cache = CacheStore::default();
    let now = Utc::now();
    cache.put(CacheEntry::offline("delta", now + Duration::seconds(30)));

    assert!(cache.get_at("delta", now).is_fresh());
    assert!(!cache.get_at("delta", now + Duration::seconds(30)).is_fresh());
  }

  #[test]
  fn test_put_overwrites_live_with_offline() {
    let cache = CacheStore::default();
    cache.record_live(stream("eps", 5));
    cache.record_offline("eps");

    let entry = cache.get("eps").entry().unwrap();
    assert!(entry.is_offline());
    assert!(entry.data().is_none());
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_zero_ttl_entries_are_immediately_stale() {
    let cache = CacheStore::new(Duration::zero());
    cache.record_offline("zeta");
    assert!(!cache.get("zeta").is_fresh());
  }

  #[test]
  fn test_concurrent_writers_never_leave_a_mixed_entry() {
    let cache = Arc::new(CacheStore::default());
    let mut handles = Vec::new();

    for i in 0..8u64 {
      let cache = Arc::clone(&cache);
      handles.push(std::thread::spawn(move || {
        for n in 0..500u64 {
          if (i + n) % 2 == 0 {
            cache.record_live(stream("shared", n));
          } else {
            cache.record_offline("shared");
          }
          let entry = cache.get("shared").entry().unwrap();
          assert_eq!(entry.is_offline(), entry.data().is_none());
        }
      }));
    }

    for handle in handles {
      handle.join().unwrap();
    }
    assert_eq!(cache.len(), 1);
  }
}
