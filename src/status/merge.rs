//! Assembles the per-channel response from cache hits and fresh batch results.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::cache::{CacheEntry, CacheStore};
use crate::twitch::Stream;

/// What the proxy reports for one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelStatus {
  #[serde(serialize_with = "serialize_live")]
  Live(Stream),
  /// Not live, or unknown because upstream could not be asked
  Offline { username: String },
}

impl ChannelStatus {
  pub fn offline(username: &str) -> Self {
    ChannelStatus::Offline {
      username: username.to_string(),
    }
  }

  pub fn is_live(&self) -> bool {
    matches!(self, ChannelStatus::Live(_))
  }

  fn from_entry(key: &str, entry: &CacheEntry) -> Self {
    match entry.data() {
      Some(stream) => ChannelStatus::Live(stream.clone()),
      None => Self::offline(key),
    }
  }
}

/// A live stream as the extension reads it: the canonical fields plus the
/// legacy `channel` object, `viewers`, `created_at` and the raw upstream names.
#[derive(Serialize)]
struct LiveStreamBody<'a> {
  #[serde(flatten)]
  stream: &'a Stream,
  user_login: &'a str,
  user_name: &'a str,
  title: &'a str,
  game_name: &'a str,
  channel: LegacyChannel<'a>,
  viewers: u64,
  created_at: DateTime<Utc>,
  cached: bool,
}

#[derive(Serialize)]
struct LegacyChannel<'a> {
  display_name: &'a str,
  status: &'a str,
}

fn serialize_live<S: Serializer>(stream: &Stream, serializer: S) -> Result<S::Ok, S::Error> {
  LiveStreamBody {
    stream,
    user_login: &stream.username,
    user_name: &stream.display_name,
    title: &stream.status,
    game_name: &stream.game,
    channel: LegacyChannel {
      // The extension has always shown the login here.
      display_name: &stream.username,
      status: &stream.status,
    },
    viewers: stream.viewer_count,
    created_at: stream.started_at,
    cached: true,
  }
  .serialize(serializer)
}

/// Build the response map. Its key set is exactly `requested`.
///
/// Precedence per key: a freshly fetched stream, then a fresh offline
/// confirmation, then whatever the cache had (fresh or stale), then the
/// offline placeholder.
pub fn merge(
  requested: &[String],
  cache_hits: &HashMap<String, CacheEntry>,
  fresh_results: &[Stream],
  offline_keys: &HashSet<String>,
) -> BTreeMap<String, ChannelStatus> {
  let live: HashMap<&str, &Stream> = fresh_results
    .iter()
    .map(|stream| (stream.username.as_str(), stream))
    .collect();

  requested
    .iter()
    .map(|key| {
      let status = if let Some(stream) = live.get(key.as_str()) {
        ChannelStatus::Live((*stream).clone())
      } else if offline_keys.contains(key) {
        ChannelStatus::offline(key)
      } else if let Some(entry) = cache_hits.get(key) {
        ChannelStatus::from_entry(key, entry)
      } else {
        ChannelStatus::offline(key)
      };
      (key.clone(), status)
    })
    .collect()
}

/// Record fresh batch outcomes so later requests inside the TTL skip upstream.
pub fn write_back(cache: &CacheStore, fresh_results: &[Stream], offline_keys: &HashSet<String>) {
  for stream in fresh_results {
    cache.record_live(stream.clone());
  }
  for key in offline_keys {
    cache.record_offline(key);
  }
}
