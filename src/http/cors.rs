//! Cross-origin policy: a static allow-list applied to every response.

use axum::extract::Request;
use axum::http::header::{
  HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
  ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
  ALLOW, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, ORIGIN, PROXY_AUTHENTICATE,
  PROXY_AUTHORIZATION, SET_COOKIE, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub const ALLOWED_ORIGINS: &str = "*";
pub const ALLOWED_METHODS: &str = "GET, HEAD, POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// The allow-list as (header, value) pairs.
pub fn cors_headers() -> [(HeaderName, HeaderValue); 3] {
  [
    (
      ACCESS_CONTROL_ALLOW_ORIGIN,
      HeaderValue::from_static(ALLOWED_ORIGINS),
    ),
    (
      ACCESS_CONTROL_ALLOW_METHODS,
      HeaderValue::from_static(ALLOWED_METHODS),
    ),
    (
      ACCESS_CONTROL_ALLOW_HEADERS,
      HeaderValue::from_static(ALLOWED_HEADERS),
    ),
  ]
}

/// Answer every `OPTIONS` request before routing.
///
/// A CORS preflight gets an empty 200 (the allow-list is added by the outer
/// header layers); any other `OPTIONS` gets an `Allow` header.
pub async fn handle_options(request: Request, next: Next) -> Response {
  if request.method() != Method::OPTIONS {
    return next.run(request).await;
  }

  if is_preflight(request.headers()) {
    StatusCode::OK.into_response()
  } else {
    (StatusCode::OK, [(ALLOW, ALLOWED_METHODS)]).into_response()
  }
}

fn is_preflight(headers: &HeaderMap) -> bool {
  headers.contains_key(ORIGIN)
    && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    && headers.contains_key(ACCESS_CONTROL_REQUEST_HEADERS)
}

/// Drop upstream-only headers from a relayed response.
pub fn strip_upstream_headers(mut headers: HeaderMap) -> HeaderMap {
  const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
  const X_SERVED_BY: HeaderName = HeaderName::from_static("x-served-by");

  for name in [
    X_SERVED_BY,
    SET_COOKIE,
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
    // The body is re-streamed, possibly decoded.
    CONTENT_LENGTH,
    CONTENT_ENCODING,
  ] {
    headers.remove(&name);
  }

  headers
}
