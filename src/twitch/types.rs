use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A live stream, normalized from the upstream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
  /// Lowercased login; the only identity a stream has
  pub username: String,
  pub display_name: String,
  /// Stream title
  pub status: String,
  pub game: String,
  pub viewer_count: u64,
  pub started_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail_url: Option<String>,
}

/// Bearer credential for upstream calls.
///
/// Replaced wholesale on renewal, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
  value: String,
  expires_at: DateTime<Utc>,
}

impl Token {
  pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
    Self {
      value: value.into(),
      expires_at,
    }
  }

  pub fn value(&self) -> &str {
    &self.value
  }

  pub fn expires_at(&self) -> DateTime<Utc> {
    self.expires_at
  }

  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    now < self.expires_at
  }
}

// Keeps the credential out of logs.
impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Token")
      .field("value", &"<redacted>")
      .field("expires_at", &self.expires_at)
      .finish()
  }
}
