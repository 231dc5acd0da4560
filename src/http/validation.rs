//! Normalization and validation of client-supplied identifiers.
//!
//! Channel names are lowercased here and nowhere else; everything downstream
//! assumes canonical keys.

use std::collections::HashSet;

use crate::error::ProxyError;

pub const MAX_CHANNEL_NAME_LEN: usize = 25;
pub const MAX_PREVIEW_DIMENSION: u32 = 4096;

/// Trim and lowercase one channel name, rejecting anything that cannot be a login.
pub fn normalize_channel(raw: &str) -> Result<String, ProxyError> {
  let name = raw.trim().to_lowercase();

  if name.is_empty() {
    return Err(ProxyError::BadRequest(
      "channel names must not be empty".to_string(),
    ));
  }
  if name.len() > MAX_CHANNEL_NAME_LEN {
    return Err(ProxyError::BadRequest(format!(
      "channel name too long: {}",
      name
    )));
  }
  if !name
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
  {
    return Err(ProxyError::BadRequest(format!(
      "invalid channel name: {}",
      name
    )));
  }

  Ok(name)
}

/// Requested channels after normalization.
#[derive(Debug, Default, PartialEq)]
pub struct ChannelSelection {
  /// Well-formed logins, safe to send upstream
  pub lookup: Vec<String>,
  /// Names that cannot be logins; answered with the offline placeholder
  pub unknown: Vec<String>,
}

/// Trim, lowercase and dedupe every name, keeping first-seen order.
///
/// A malformed name never fails the request; it is split out so the caller can
/// answer it without asking upstream.
pub fn normalize_channels(raw: &[String]) -> ChannelSelection {
  let mut seen = HashSet::with_capacity(raw.len());
  let mut selection = ChannelSelection::default();

  for name in raw {
    let key = name.trim().to_lowercase();
    if !seen.insert(key.clone()) {
      continue;
    }
    match normalize_channel(&key) {
      Ok(login) => selection.lookup.push(login),
      Err(_) => selection.unknown.push(key),
    }
  }

  selection
}

/// Parse a preview width or height.
pub fn parse_dimension(raw: &str) -> Result<u32, ProxyError> {
  match raw.parse::<u32>() {
    Ok(n) if n > 0 && n <= MAX_PREVIEW_DIMENSION => Ok(n),
    _ => Err(ProxyError::BadRequest(format!(
      "invalid preview dimension: {}",
      raw
    ))),
  }
}
