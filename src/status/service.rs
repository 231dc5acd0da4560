//! The channel status pipeline: cache → plan → fetch → merge.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::batch::BatchPlanner;
use super::merge::{self, ChannelStatus};
use crate::cache::{CacheEntry, CacheLookup, CacheStore};
use crate::error::ProxyError;
use crate::twitch::{Stream, StreamSource, Token, TokenProvider, TokenSource};

/// A status request whose channel names are already lowercased and deduplicated.
#[derive(Debug, Clone, Default)]
pub struct StatusRequest {
  pub channels: Vec<String>,
  /// Treat fresh entries as misses (only when the service allows it)
  pub refresh: bool,
}

/// Outcome of one status request.
#[derive(Debug, Clone)]
pub struct StatusReport {
  /// One entry per requested channel
  pub channels: BTreeMap<String, ChannelStatus>,
  /// Number of upstream batch calls issued
  pub batches: usize,
  /// Batches that failed or timed out; their channels fell back to cache or placeholder
  pub failed_batches: usize,
}

/// Cached, batched channel status lookups against the upstream streams API.
///
/// One instance is built at startup and shared by every request handler.
pub struct ChannelStatusService<S: StreamSource, T: TokenSource> {
  cache: Arc<CacheStore>,
  tokens: Arc<TokenProvider<T>>,
  source: Arc<S>,
  planner: BatchPlanner,
  batch_timeout: Duration,
  allow_forced_refresh: bool,
}

impl<S: StreamSource, T: TokenSource> ChannelStatusService<S, T> {
  pub fn new(
    cache: Arc<CacheStore>,
    tokens: Arc<TokenProvider<T>>,
    source: Arc<S>,
    planner: BatchPlanner,
    batch_timeout: Duration,
  ) -> Self {
    Self {
      cache,
      tokens,
      source,
      planner,
      batch_timeout,
      allow_forced_refresh: false,
    }
  }

  /// Let requests carrying `refresh: true` bypass fresh cache entries.
  pub fn with_forced_refresh(mut self, allow: bool) -> Self {
    self.allow_forced_refresh = allow;
    self
  }

  pub fn cache(&self) -> &Arc<CacheStore> {
    &self.cache
  }

  pub fn source(&self) -> &Arc<S> {
    &self.source
  }

  /// Resolve the live status of every requested channel.
  ///
  /// Per-batch upstream failures are absorbed: affected channels fall back to
  /// their last cached value or the offline placeholder. Only a failure to
  /// obtain a token is returned as an error.
  pub async fn resolve(&self, request: &StatusRequest) -> Result<StatusReport, ProxyError> {
    let bypass_fresh = request.refresh && self.allow_forced_refresh;

    let mut known: HashMap<String, CacheEntry> = HashMap::new();
    let mut misses: Vec<String> = Vec::new();

    for key in &request.channels {
      match self.cache.get(key) {
        CacheLookup::Fresh(entry) if !bypass_fresh => {
          known.insert(key.clone(), entry);
        }
        CacheLookup::Fresh(entry) | CacheLookup::Stale(entry) => {
          // Kept as a fallback in case this channel's batch fails.
          known.insert(key.clone(), entry);
          misses.push(key.clone());
        }
        CacheLookup::Absent => misses.push(key.clone()),
      }
    }

    let groups = self.planner.plan(&misses);
    debug!(
      requested = request.channels.len(),
      hits = request.channels.len() - misses.len(),
      misses = misses.len(),
      batches = groups.len(),
      "planned status lookup"
    );

    if groups.is_empty() {
      return Ok(StatusReport {
        channels: merge::merge(&request.channels, &known, &[], &HashSet::new()),
        batches: 0,
        failed_batches: 0,
      });
    }

    let token = self.tokens.get_token().await?;
    let outcomes = join_all(groups.iter().map(|group| self.fetch_with_timeout(group, &token))).await;

    let mut fresh: Vec<Stream> = Vec::new();
    let mut offline: HashSet<String> = HashSet::new();
    let mut failed_batches = 0;

    for (index, (group, outcome)) in groups.iter().zip(outcomes).enumerate() {
      match outcome {
        Ok(streams) => {
          let (live, not_live) = partition_batch(group, streams);
          fresh.extend(live);
          offline.extend(not_live);
        }
        Err(e) => {
          failed_batches += 1;
          warn!(batch = index, size = group.len(), error = %e, "upstream batch failed");
          if matches!(e, ProxyError::AuthFailure(_)) {
            self.tokens.invalidate(&token).await;
          }
        }
      }
    }

    merge::write_back(&self.cache, &fresh, &offline);

    Ok(StatusReport {
      channels: merge::merge(&request.channels, &known, &fresh, &offline),
      batches: groups.len(),
      failed_batches,
    })
  }

  async fn fetch_with_timeout(
    &self,
    group: &[String],
    token: &Token,
  ) -> Result<Vec<Stream>, ProxyError> {
    match tokio::time::timeout(self.batch_timeout, self.source.fetch_batch(group, token)).await {
      Ok(result) => result,
      Err(_) => Err(ProxyError::Timeout(self.batch_timeout)),
    }
  }
}

/// Split one batch's result into live streams for requested channels and the
/// requested channels upstream did not report.
fn partition_batch(group: &[String], streams: Vec<Stream>) -> (Vec<Stream>, Vec<String>) {
  let wanted: HashSet<&str> = group.iter().map(String::as_str).collect();
  let live: Vec<Stream> = streams
    .into_iter()
    .filter(|stream| wanted.contains(stream.username.as_str()))
    .collect();

  let live_names: HashSet<&str> = live.iter().map(|s| s.username.as_str()).collect();
  let not_live = group
    .iter()
    .filter(|key| !live_names.contains(key.as_str()))
    .cloned()
    .collect();

  (live, not_live)
}
