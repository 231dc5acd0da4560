//! Shared test utilities for the HTTP integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
  body::Body,
  http::{HeaderMap, HeaderValue, Request, StatusCode},
  response::Response,
  Router,
};
use chrono::{TimeZone, Utc};
use tower::ServiceExt;

use live_proxy::cache::CacheStore;
use live_proxy::error::ProxyError;
use live_proxy::http::{create_router, AppState};
use live_proxy::status::{BatchPlanner, ChannelStatusService};
use live_proxy::twitch::{
  PreviewImage, PreviewSource, Stream, StreamSource, Token, TokenProvider, TokenSource,
};

pub const TEST_BODY_LIMIT: usize = 64 * 1024;
pub const PANIC_DETAIL: &str = "fetch exploded with client_secret=hunter2";
pub const PREVIEW_BYTES: &[u8] = b"\xff\xd8\xff\xe0 not really a jpeg";

/// In-process stand-in for the upstream API.
///
/// Channels in `live` are reported live, channels in `broken` make their whole
/// batch fail, channels in `panics` make the fetch panic, and `reject_token`
/// makes every batch fail authentication.
#[derive(Default)]
pub struct MockUpstream {
  pub live: HashSet<String>,
  pub broken: HashSet<String>,
  pub panics: HashSet<String>,
  pub reject_token: bool,
  pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockUpstream {
  pub fn with_live(names: &[&str]) -> Self {
    Self {
      live: names.iter().map(|n| n.to_string()).collect(),
      ..Self::default()
    }
  }

  pub fn calls(&self) -> Vec<Vec<String>> {
    self.calls.lock().unwrap().clone()
  }
}

pub fn sample_stream(username: &str) -> Stream {
  Stream {
    username: username.to_string(),
    display_name: username.to_uppercase(),
    status: format!("{} plays something", username),
    game: "Just Chatting".to_string(),
    viewer_count: 42,
    started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    thumbnail_url: None,
  }
}

#[async_trait]
impl StreamSource for MockUpstream {
  async fn fetch_batch(&self, group: &[String], _token: &Token) -> Result<Vec<Stream>, ProxyError> {
    self.calls.lock().unwrap().push(group.to_vec());

    if group.iter().any(|name| self.panics.contains(name)) {
      panic!("{}", PANIC_DETAIL);
    }
    if self.reject_token {
      return Err(ProxyError::AuthFailure("token rejected".to_string()));
    }
    if group.iter().any(|name| self.broken.contains(name)) {
      return Err(ProxyError::UpstreamUnavailable("boom".to_string()));
    }

    Ok(
      group
        .iter()
        .filter(|name| self.live.contains(*name))
        .map(|name| sample_stream(name))
        .collect(),
    )
  }
}

#[async_trait]
impl PreviewSource for MockUpstream {
  async fn fetch_preview(
    &self,
    username: &str,
    _width: u32,
    _height: u32,
  ) -> Result<PreviewImage, ProxyError> {
    if self.broken.contains(username) {
      return Err(ProxyError::UpstreamUnavailable("connect failed".to_string()));
    }

    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("image/jpeg"));
    headers.insert("cache-control", HeaderValue::from_static("max-age=300"));
    headers.insert("x-served-by", HeaderValue::from_static("cache-fra-1"));
    headers.insert("set-cookie", HeaderValue::from_static("session=abc"));

    Ok(PreviewImage {
      status: StatusCode::OK,
      headers,
      body: Body::from(PREVIEW_BYTES),
    })
  }
}

/// Token source that counts acquisitions and can be told to fail.
#[derive(Default)]
pub struct MockTokens {
  pub fail: bool,
  pub acquired: AtomicUsize,
}

impl MockTokens {
  pub fn acquired(&self) -> usize {
    self.acquired.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TokenSource for MockTokens {
  async fn acquire(&self) -> Result<Token, ProxyError> {
    self.acquired.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      return Err(ProxyError::AuthFailure("credential endpoint refused".to_string()));
    }
    Ok(Token::new("test-token", Utc::now() + chrono::Duration::hours(1)))
  }
}

/// A router over the given mocks plus handles to inspect them afterwards.
pub struct TestApp {
  pub router: Router,
  pub upstream: Arc<MockUpstream>,
  pub tokens: Arc<TokenProvider<MockTokens>>,
}

pub fn create_test_app(upstream: MockUpstream) -> TestApp {
  create_test_app_with(upstream, MockTokens::default(), false)
}

pub fn create_test_app_with(
  upstream: MockUpstream,
  tokens: MockTokens,
  allow_forced_refresh: bool,
) -> TestApp {
  let upstream = Arc::new(upstream);
  let tokens = Arc::new(TokenProvider::new(tokens));

  let service = ChannelStatusService::new(
    Arc::new(CacheStore::default()),
    Arc::clone(&tokens),
    Arc::clone(&upstream),
    BatchPlanner::new(100),
    Duration::from_secs(5),
  )
  .with_forced_refresh(allow_forced_refresh);

  TestApp {
    router: create_router(AppState::new(service, TEST_BODY_LIMIT)),
    upstream,
    tokens,
  }
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
  router.clone().oneshot(request).await.unwrap()
}

/// POST a JSON value to `/channel-status`.
pub async fn post_status(router: &Router, body: serde_json::Value) -> Response {
  let request = Request::builder()
    .method("POST")
    .uri("/channel-status")
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .unwrap();
  send(router, request).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
  axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap()
    .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
  serde_json::from_slice(&body_bytes(response).await).unwrap()
}
