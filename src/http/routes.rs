//! HTTP route definitions and handlers.

use std::any::Any;
use std::sync::Arc;

use axum::{
  async_trait,
  body::Bytes,
  extract::{FromRequest, Path, Request, State},
  http::{HeaderName, HeaderValue, StatusCode},
  middleware,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::cors;
use super::state::AppState;
use super::validation::{normalize_channel, normalize_channels, parse_dimension};
use crate::error::{ErrorBody, ProxyError};
use crate::status::{ChannelStatus, StatusRequest};
use crate::twitch::{PreviewSource, StreamSource, TokenSource};

/// Set on a 200 status response when some upstream batches failed.
pub const PARTIAL_FAILURE_HEADER: HeaderName = HeaderName::from_static("x-partial-failure");

/// JSON body extractor that ignores `Content-Type` and reports bad input as
/// 400 instead of axum's 415/422.
///
/// Preserves 413 Payload Too Large for body limit errors.
pub struct LenientJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for LenientJson<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = Response;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
      if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        (
          StatusCode::PAYLOAD_TOO_LARGE,
          Json(ErrorBody::new("Request body too large.")),
        )
          .into_response()
      } else {
        ProxyError::BadRequest(rejection.body_text()).into_response()
      }
    })?;

    serde_json::from_slice(&bytes)
      .map(LenientJson)
      .map_err(|e| ProxyError::BadRequest(format!("invalid request body: {}", e)).into_response())
  }
}

/// Body of `POST /channel-status`.
#[derive(Debug, Deserialize)]
pub struct ChannelStatusBody {
  pub channels: Vec<String>,
  #[serde(default)]
  pub refresh: bool,
}

/// Creates the HTTP router with every endpoint, the CORS allow-list and
/// request tracing.
pub fn create_router<S, T>(state: AppState<S, T>) -> Router
where
  S: StreamSource + PreviewSource + 'static,
  T: TokenSource + 'static,
{
  let body_limit = state.body_limit;
  let [origin, methods, headers] = cors::cors_headers();

  Router::new()
    .route(
      "/channel-status",
      post(channel_status::<S, T>).fallback(teapot),
    )
    .route("/user-follows", get(user_follows).fallback(teapot))
    .route("/user-follows/*rest", get(user_follows).fallback(teapot))
    .route(
      "/channel-preview/:username/:width/:height",
      get(channel_preview::<S, T>).fallback(teapot),
    )
    .route("/version", get(version).fallback(teapot))
    .fallback(teapot)
    .with_state(Arc::new(state))
    .layer(RequestBodyLimitLayer::new(body_limit))
    .layer(CatchPanicLayer::custom(handle_panic))
    .layer(middleware::from_fn(cors::handle_options))
    .layer(SetResponseHeaderLayer::overriding(origin.0, origin.1))
    .layer(SetResponseHeaderLayer::overriding(methods.0, methods.1))
    .layer(SetResponseHeaderLayer::overriding(headers.0, headers.1))
    .layer(TraceLayer::new_for_http())
}

// ============================================================
// Handlers
// ============================================================

async fn channel_status<S, T>(
  State(state): State<Arc<AppState<S, T>>>,
  LenientJson(body): LenientJson<ChannelStatusBody>,
) -> Result<Response, ProxyError>
where
  S: StreamSource + PreviewSource + 'static,
  T: TokenSource + 'static,
{
  let selection = normalize_channels(&body.channels);
  let request = StatusRequest {
    channels: selection.lookup,
    refresh: body.refresh,
  };

  let mut report = state.status.resolve(&request).await?;
  for name in selection.unknown {
    let placeholder = ChannelStatus::offline(&name);
    report.channels.insert(name, placeholder);
  }

  let mut response = Json(report.channels).into_response();
  if report.failed_batches > 0 {
    response.headers_mut().insert(
      PARTIAL_FAILURE_HEADER,
      HeaderValue::from(report.failed_batches),
    );
  }
  Ok(response)
}

/// The follows API was retired upstream; clients still poll it.
async fn user_follows() -> impl IntoResponse {
  Json(serde_json::json!({ "follows": [] }))
}

async fn channel_preview<S, T>(
  State(state): State<Arc<AppState<S, T>>>,
  Path((username, width, height)): Path<(String, String, String)>,
) -> Result<Response, ProxyError>
where
  S: StreamSource + PreviewSource + 'static,
  T: TokenSource + 'static,
{
  let username = normalize_channel(&username)?;
  let width = parse_dimension(&width)?;
  let height = parse_dimension(&height)?;

  let image = state
    .previews
    .fetch_preview(&username, width, height)
    .await?;

  let mut response = Response::new(image.body);
  *response.status_mut() = image.status;
  *response.headers_mut() = cors::strip_upstream_headers(image.headers);
  Ok(response)
}

async fn version() -> impl IntoResponse {
  Json(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

async fn teapot() -> StatusCode {
  StatusCode::IM_A_TEAPOT
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
  ProxyError::Internal("request handler panicked".to_string()).into_response()
}
