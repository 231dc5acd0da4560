use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::HeaderValue;
use tracing::debug;
use url::Url;

use super::api_types::ApiStreamsResponse;
use super::types::{Stream, Token};
use crate::config::UpstreamConfig;
use crate::error::ProxyError;

/// Issues one authenticated streams query per batch of channel names.
#[async_trait]
pub trait StreamSource: Send + Sync {
  /// Live streams among `group`. Channels absent from the result are offline.
  async fn fetch_batch(&self, group: &[String], token: &Token) -> Result<Vec<Stream>, ProxyError>;
}

/// An upstream preview image, ready to be relayed.
pub struct PreviewImage {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Body,
}

/// Fetches channel preview images from the upstream image host.
#[async_trait]
pub trait PreviewSource: Send + Sync {
  async fn fetch_preview(
    &self,
    username: &str,
    width: u32,
    height: u32,
  ) -> Result<PreviewImage, ProxyError>;
}

/// Helix API client wrapper
#[derive(Clone)]
pub struct HelixClient {
  http: reqwest::Client,
  streams_url: Url,
  preview_url: String,
  client_id: HeaderValue,
}

impl HelixClient {
  pub fn new(http: reqwest::Client, config: &UpstreamConfig, client_id: &str) -> Result<Self> {
    let streams_url = Url::parse(&config.streams_url)
      .map_err(|e| eyre!("Invalid upstream.streams_url {}: {}", config.streams_url, e))?;

    let client_id =
      HeaderValue::from_str(client_id).map_err(|e| eyre!("Invalid client id: {}", e))?;

    Ok(Self {
      http,
      streams_url,
      preview_url: config.preview_url.trim_end_matches('/').to_string(),
      client_id,
    })
  }

  /// Streams query URL for one batch: `?first=N&user_login=a&user_login=b...`
  pub fn batch_url(&self, group: &[String]) -> Url {
    let mut url = self.streams_url.clone();
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("first", &group.len().max(1).to_string());
      for login in group {
        query.append_pair("user_login", login);
      }
    }
    url
  }

  pub fn preview_image_url(&self, username: &str, width: u32, height: u32) -> String {
    format!(
      "{}/live_user_{}-{}x{}.jpg",
      self.preview_url, username, width, height
    )
  }
}

#[async_trait]
impl StreamSource for HelixClient {
  async fn fetch_batch(&self, group: &[String], token: &Token) -> Result<Vec<Stream>, ProxyError> {
    let response = self
      .http
      .get(self.batch_url(group))
      .bearer_auth(token.value())
      .header("Client-Id", self.client_id.clone())
      .send()
      .await
      .map_err(|e| ProxyError::UpstreamUnavailable(e.without_url().to_string()))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
      return Err(ProxyError::AuthFailure(
        "streams endpoint rejected the token".to_string(),
      ));
    }
    if !status.is_success() {
      return Err(ProxyError::UpstreamUnavailable(format!(
        "streams endpoint returned {}",
        status
      )));
    }

    let body: ApiStreamsResponse = response.json().await.map_err(|e| {
      ProxyError::UpstreamUnavailable(format!("unreadable streams response: {}", e.without_url()))
    })?;

    let streams: Vec<Stream> = body
      .data
      .into_iter()
      .filter(|record| record.is_live())
      .map(|record| record.into_stream())
      .collect();

    debug!(requested = group.len(), live = streams.len(), "fetched batch");
    Ok(streams)
  }
}

#[async_trait]
impl PreviewSource for HelixClient {
  async fn fetch_preview(
    &self,
    username: &str,
    width: u32,
    height: u32,
  ) -> Result<PreviewImage, ProxyError> {
    let response = self
      .http
      .get(self.preview_image_url(username, width, height))
      .send()
      .await
      .map_err(|e| ProxyError::UpstreamUnavailable(e.without_url().to_string()))?;

    Ok(PreviewImage {
      status: response.status(),
      headers: response.headers().clone(),
      body: Body::from_stream(response.bytes_stream()),
    })
  }
}
