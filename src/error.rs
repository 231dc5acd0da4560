//! Error taxonomy for the request path.
//!
//! Startup and configuration failures use `color_eyre`; everything that can
//! happen while serving a request is a [`ProxyError`] so the HTTP boundary can
//! pick a status code without inspecting strings.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Message returned for anything that is not the caller's fault.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong processing this request.";

#[derive(Debug, Error)]
pub enum ProxyError {
  /// Malformed body, missing or invalid `channels`, bad path parameters.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The credential endpoint failed, returned no token, or upstream rejected it.
  #[error("upstream authentication failed: {0}")]
  AuthFailure(String),

  /// An upstream call failed (connect error, non-success status, bad payload).
  #[error("upstream unavailable: {0}")]
  UpstreamUnavailable(String),

  /// An upstream call did not settle within its deadline.
  #[error("upstream call timed out after {0:?}")]
  Timeout(Duration),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ProxyError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::AuthFailure(_) | Self::UpstreamUnavailable(_) | Self::Timeout(_) => {
        StatusCode::BAD_GATEWAY
      }
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Message safe to show to a client. Only `BadRequest` echoes its detail.
  pub fn public_message(&self) -> String {
    match self {
      Self::BadRequest(reason) => reason.clone(),
      Self::AuthFailure(_) => "Upstream authentication failed.".to_string(),
      Self::UpstreamUnavailable(_) | Self::Timeout(_) => "Upstream service unavailable.".to_string(),
      Self::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
    }
  }
}

/// JSON error body: `{ "error": true, "message": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error: bool,
  pub message: String,
}

impl ErrorBody {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
    }
  }
}

impl IntoResponse for ProxyError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    (status, Json(ErrorBody::new(self.public_message()))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_codes_distinguish_error_kinds() {
    assert_eq!(
      ProxyError::BadRequest("x".into()).status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      ProxyError::AuthFailure("x".into()).status_code(),
      StatusCode::BAD_GATEWAY
    );
    assert_eq!(
      ProxyError::Internal("x".into()).status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn test_public_message_hides_internal_detail() {
    let err = ProxyError::Internal("token=abc123 leaked".into());
    assert_eq!(err.public_message(), GENERIC_ERROR_MESSAGE);

    let err = ProxyError::AuthFailure("client_secret=shh".into());
    assert!(!err.public_message().contains("shh"));
  }

  #[test]
  fn test_bad_request_echoes_reason() {
    let err = ProxyError::BadRequest("channels must be an array".into());
    assert_eq!(err.public_message(), "channels must be an array");
  }
}
