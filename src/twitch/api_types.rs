//! Serde-deserializable types matching the Helix API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on what the proxy hands out.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::types::Stream;

// ============================================================================
// Streams endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStreamsResponse {
  #[serde(default)]
  pub data: Vec<ApiStream>,
}

#[derive(Debug, Deserialize)]
pub struct ApiStream {
  pub user_login: String,
  #[serde(default)]
  pub user_name: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub game_name: String,
  #[serde(default)]
  pub viewer_count: u64,
  pub started_at: DateTime<Utc>,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
  /// "live", or an empty string when the stream ended mid-request
  #[serde(rename = "type", default)]
  pub stream_type: String,
}

impl ApiStream {
  pub fn is_live(&self) -> bool {
    self.stream_type.is_empty() || self.stream_type.eq_ignore_ascii_case("live")
  }

  /// Map upstream field names onto the canonical stream shape.
  pub fn into_stream(self) -> Stream {
    let username = self.user_login.to_lowercase();
    let display_name = if self.user_name.is_empty() {
      self.user_login
    } else {
      self.user_name
    };

    Stream {
      username,
      display_name,
      status: self.title,
      game: self.game_name,
      viewer_count: self.viewer_count,
      started_at: self.started_at,
      thumbnail_url: self.thumbnail_url.filter(|u| !u.is_empty()),
    }
  }
}

// ============================================================================
// OAuth client-credentials response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
  pub access_token: Option<String>,
  pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"{
    "data": [
      {
        "id": "40952121085",
        "user_id": "101051819",
        "user_login": "AfroInferno",
        "user_name": "afro",
        "game_id": "32982",
        "game_name": "Grand Theft Auto V",
        "type": "live",
        "title": "Jacob: Digital Den Laptops & Routers",
        "viewer_count": 1490,
        "started_at": "2021-03-10T03:18:11Z",
        "language": "en",
        "thumbnail_url": "https://static-cdn.jtvnw.net/previews-ttv/live_user_afro-{width}x{height}.jpg",
        "tag_ids": [],
        "is_mature": false
      }
    ],
    "pagination": {}
  }"#;

  #[test]
  fn test_stream_record_normalizes_field_names() {
    let response: ApiStreamsResponse = serde_json::from_str(SAMPLE).unwrap();
    assert_eq!(response.data.len(), 1);

    let record = response.data.into_iter().next().unwrap();
    assert!(record.is_live());

    let stream = record.into_stream();
    assert_eq!(stream.username, "afroinferno");
    assert_eq!(stream.display_name, "afro");
    assert_eq!(stream.status, "Jacob: Digital Den Laptops & Routers");
    assert_eq!(stream.game, "Grand Theft Auto V");
    assert_eq!(stream.viewer_count, 1490);
    assert_eq!(stream.started_at.to_rfc3339(), "2021-03-10T03:18:11+00:00");
  }

  #[test]
  fn test_missing_display_name_falls_back_to_login() {
    let raw = r#"{"user_login":"someone","started_at":"2024-01-01T00:00:00Z"}"#;
    let stream = serde_json::from_str::<ApiStream>(raw).unwrap().into_stream();
    assert_eq!(stream.display_name, "someone");
    assert_eq!(stream.thumbnail_url, None);
  }

  #[test]
  fn test_missing_data_array_is_empty() {
    let response: ApiStreamsResponse = serde_json::from_str("{}").unwrap();
    assert!(response.data.is_empty());
  }

  #[test]
  fn test_token_response_without_access_token() {
    let response: ApiTokenResponse =
      serde_json::from_str(r#"{"status":400,"message":"invalid client"}"#).unwrap();
    assert!(response.access_token.is_none());
  }
}
