//! Entry and lookup types for the status cache.

use chrono::{DateTime, Utc};

use crate::twitch::Stream;

/// What the cache knows about one channel.
///
/// Either live data or a confirmed-offline marker, never both. A channel that
/// was never fetched has no entry at all.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  key: String,
  data: Option<Stream>,
  offline: bool,
  expires_at: DateTime<Utc>,
}

impl CacheEntry {
  /// Entry for a channel that was live at fetch time. Keyed by the stream's username.
  pub fn live(stream: Stream, expires_at: DateTime<Utc>) -> Self {
    Self {
      key: stream.username.to_lowercase(),
      data: Some(stream),
      offline: false,
      expires_at,
    }
  }

  /// Entry recording that a channel was confirmed not live.
  pub fn offline(key: &str, expires_at: DateTime<Utc>) -> Self {
    Self {
      key: key.to_lowercase(),
      data: None,
      offline: true,
      expires_at,
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn data(&self) -> Option<&Stream> {
    self.data.as_ref()
  }

  pub fn is_offline(&self) -> bool {
    self.offline
  }

  pub fn expires_at(&self) -> DateTime<Utc> {
    self.expires_at
  }

  /// Stale at or after `expires_at`.
  pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
    now < self.expires_at
  }
}

/// Result of a cache lookup, evaluated at call time.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
  /// Entry still inside its freshness window
  Fresh(CacheEntry),
  /// Entry past its window; must be refetched but usable as a last resort
  Stale(CacheEntry),
  /// Never fetched
  Absent,
}

impl CacheLookup {
  pub fn is_fresh(&self) -> bool {
    matches!(self, CacheLookup::Fresh(_))
  }

  /// The entry regardless of freshness.
  pub fn entry(self) -> Option<CacheEntry> {
    match self {
      CacheLookup::Fresh(entry) | CacheLookup::Stale(entry) => Some(entry),
      CacheLookup::Absent => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn stream(username: &str) -> Stream {
    Stream {
      username: username.to_string(),
      display_name: username.to_string(),
      status: "title".to_string(),
      game: "game".to_string(),
      viewer_count: 1,
      started_at: Utc::now(),
      thumbnail_url: None,
    }
  }

  #[test]
  fn test_live_entry_has_data_and_is_not_offline() {
    let entry = CacheEntry::live(stream("Alpha"), Utc::now());
    assert_eq!(entry.key(), "alpha");
    assert!(entry.data().is_some());
    assert!(!entry.is_offline());
  }

  #[test]
  fn test_offline_entry_has_no_data() {
    let entry = CacheEntry::offline("Beta", Utc::now());
    assert_eq!(entry.key(), "beta");
    assert!(entry.data().is_none());
    assert!(entry.is_offline());
  }

  #[test]
  fn test_entry_is_stale_at_expiry() {
    let now = Utc::now();
    let entry = CacheEntry::offline("a", now);
    assert!(!entry.is_fresh_at(now));
    assert!(entry.is_fresh_at(now - Duration::milliseconds(1)));
  }
}
