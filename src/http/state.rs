//! Application state for HTTP handlers.

use std::sync::Arc;

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::status::{BatchPlanner, ChannelStatusService};
use crate::twitch::{
  ClientCredentials, HelixClient, PreviewSource, StreamSource, TokenProvider, TokenSource,
};

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `S` - Upstream client answering stream and preview queries
/// * `T` - Source of upstream credentials
pub struct AppState<S, T>
where
  S: StreamSource + PreviewSource,
  T: TokenSource,
{
  /// The status pipeline, which owns the cache and token provider.
  pub status: Arc<ChannelStatusService<S, T>>,
  /// Preview image relay; the same upstream client the pipeline uses.
  pub previews: Arc<S>,
  /// Maximum accepted request body in bytes.
  pub body_limit: usize,
}

impl<S, T> AppState<S, T>
where
  S: StreamSource + PreviewSource,
  T: TokenSource,
{
  pub fn new(status: ChannelStatusService<S, T>, body_limit: usize) -> Self {
    let previews = Arc::clone(status.source());
    Self {
      status: Arc::new(status),
      previews,
      body_limit,
    }
  }
}

impl AppState<HelixClient, ClientCredentials> {
  /// Build the production service graph. Called once at startup.
  pub fn from_config(config: &Config) -> Result<Self> {
    let client_id = config.client_id()?;
    let client_secret = Config::get_client_secret()?;

    let http = reqwest::Client::builder()
      .pool_max_idle_per_host(8)
      .tcp_keepalive(std::time::Duration::from_secs(30))
      .connect_timeout(std::time::Duration::from_secs(5))
      .timeout(config.upstream.request_timeout())
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    let credentials = ClientCredentials::new(
      http.clone(),
      config.upstream.token_url.clone(),
      client_id.clone(),
      client_secret,
      config.upstream.token_refresh_margin_secs,
    );
    let helix = HelixClient::new(http, &config.upstream, &client_id)?;

    let ttl = i64::try_from(config.cache.ttl_secs)
      .map_err(|_| eyre!("cache.ttl_secs out of range: {}", config.cache.ttl_secs))?;

    let service = ChannelStatusService::new(
      Arc::new(CacheStore::new(Duration::seconds(ttl))),
      Arc::new(
        TokenProvider::new(credentials).with_acquire_timeout(config.upstream.request_timeout()),
      ),
      Arc::new(helix),
      BatchPlanner::new(config.upstream.batch_limit),
      config.upstream.batch_timeout(),
    )
    .with_forced_refresh(config.cache.allow_forced_refresh);

    Ok(Self::new(service, config.server.body_limit))
  }
}
