//! Bearer token acquisition and caching.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::api_types::ApiTokenResponse;
use super::types::Token;
use crate::error::ProxyError;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Longest lifetime believed from the token endpoint. App tokens last about
/// 60 days; anything beyond this is treated as this.
const MAX_TOKEN_LIFETIME_SECS: u64 = 90 * 24 * 60 * 60;

/// Deadline for one acquisition unless configured otherwise.
pub const DEFAULT_ACQUIRE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Something that can mint a fresh upstream credential.
#[async_trait]
pub trait TokenSource: Send + Sync {
  async fn acquire(&self) -> Result<Token, ProxyError>;
}

/// OAuth client-credentials grant against the upstream identity endpoint.
pub struct ClientCredentials {
  http: reqwest::Client,
  token_url: String,
  client_id: String,
  client_secret: String,
  refresh_margin: Duration,
}

impl ClientCredentials {
  pub fn new(
    http: reqwest::Client,
    token_url: impl Into<String>,
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    refresh_margin_secs: u64,
  ) -> Self {
    Self {
      http,
      token_url: token_url.into(),
      client_id: client_id.into(),
      client_secret: client_secret.into(),
      refresh_margin: bounded_seconds(refresh_margin_secs),
    }
  }
}

#[async_trait]
impl TokenSource for ClientCredentials {
  async fn acquire(&self) -> Result<Token, ProxyError> {
    let response = self
      .http
      .post(&self.token_url)
      .query(&[
        ("client_id", self.client_id.as_str()),
        ("client_secret", self.client_secret.as_str()),
        ("grant_type", "client_credentials"),
      ])
      .send()
      .await
      // without_url: the query string carries the secret
      .map_err(|e| ProxyError::AuthFailure(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(ProxyError::AuthFailure(format!(
        "token endpoint returned {}",
        status
      )));
    }

    let body: ApiTokenResponse = response
      .json()
      .await
      .map_err(|e| ProxyError::AuthFailure(format!("unreadable token response: {}", e.without_url())))?;

    let value = body
      .access_token
      .filter(|t| !t.is_empty())
      .ok_or_else(|| ProxyError::AuthFailure("token response had no access_token".to_string()))?;

    let lifetime = bounded_seconds(body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
    let usable_for = (lifetime - self.refresh_margin).max(Duration::zero());

    Ok(Token::new(value, Utc::now() + usable_for))
  }
}

fn bounded_seconds(secs: u64) -> Duration {
  // Lossless: the bound is far below i64::MAX.
  Duration::seconds(secs.min(MAX_TOKEN_LIFETIME_SECS) as i64)
}

/// Caches one token and renews it only when absent or expired.
///
/// Renewal happens while holding the lock, so concurrent callers that find the
/// token missing wait for the single in-flight acquisition instead of each
/// issuing their own.
/// An acquisition that outlives its deadline fails with `AuthFailure` and
/// releases the lock, so a stalled credential endpoint cannot hold up
/// every request queued behind it.
pub struct TokenProvider<T: TokenSource> {
  source: T,
  current: Mutex<Option<Token>>,
  acquire_timeout: std::time::Duration,
}

impl<T: TokenSource> TokenProvider<T> {
  pub fn new(source: T) -> Self {
    Self {
      source,
      current: Mutex::new(None),
      acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
    }
  }

  pub fn with_acquire_timeout(mut self, timeout: std::time::Duration) -> Self {
    self.acquire_timeout = timeout;
    self
  }

  pub async fn get_token(&self) -> Result<Token, ProxyError> {
    let mut current = self.current.lock().await;

    if let Some(token) = current.as_ref() {
      if token.is_valid_at(Utc::now()) {
        return Ok(token.clone());
      }
    }

    let acquired = match tokio::time::timeout(self.acquire_timeout, self.source.acquire()).await {
      Ok(result) => result,
      Err(_) => Err(ProxyError::AuthFailure(format!(
        "token endpoint did not answer within {:?}",
        self.acquire_timeout
      ))),
    };

    match acquired {
      Ok(token) => {
        info!(expires_at = %token.expires_at(), "acquired upstream token");
        *current = Some(token.clone());
        Ok(token)
      }
      Err(e) => {
        error!(error = %e, "failed to acquire upstream token");
        *current = None;
        Err(e)
      }
    }
  }

  /// Drop the cached token if it is still the one upstream rejected.
  ///
  /// A newer token installed by another request is left alone.
  pub async fn invalidate(&self, rejected: &Token) {
    let mut current = self.current.lock().await;
    if current.as_ref() == Some(rejected) {
      info!("discarding rejected upstream token");
      *current = None;
    }
  }

  pub fn source(&self) -> &T {
    &self.source
  }
}
