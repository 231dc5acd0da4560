use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Helix rejects stream queries filtering on more than this many logins.
pub const MAX_BATCH_LIMIT: usize = 100;

/// Upper bound on `cache.ttl_secs` (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub server: ServerConfig,
  pub cache: CacheConfig,
  pub upstream: UpstreamConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  /// Maximum accepted request body in bytes
  pub body_limit: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: "0.0.0.0".to_string(),
      port: 8787,
      body_limit: 64 * 1024,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Freshness window for live and offline entries alike
  pub ttl_secs: u64,
  /// Honor `"refresh": true` in status requests by bypassing fresh entries
  pub allow_forced_refresh: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: 60,
      allow_forced_refresh: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
  pub streams_url: String,
  pub token_url: String,
  /// Base URL of the preview image host
  pub preview_url: String,
  /// Application client id; may be overridden from the environment
  pub client_id: Option<String>,
  /// Channels per upstream streams call (1..=100)
  pub batch_limit: usize,
  pub batch_timeout_secs: u64,
  /// Whole-request deadline for token and preview calls
  pub request_timeout_secs: u64,
  /// Renew the token this long before upstream says it expires
  pub token_refresh_margin_secs: u64,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      streams_url: "https://api.twitch.tv/helix/streams".to_string(),
      token_url: "https://id.twitch.tv/oauth2/token".to_string(),
      preview_url: "https://static-cdn.jtvnw.net/previews-ttv".to_string(),
      client_id: None,
      batch_limit: MAX_BATCH_LIMIT,
      batch_timeout_secs: 10,
      request_timeout_secs: 10,
      token_refresh_margin_secs: 60,
    }
  }
}

impl UpstreamConfig {
  pub fn batch_timeout(&self) -> Duration {
    Duration::from_secs(self.batch_timeout_secs)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Default filter when RUST_LOG is unset
  pub level: String,
  pub json: bool,
  /// Write a daily-rolling log file here in addition to stderr
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      json: false,
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file, falling back to built-in defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./live-proxy.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/live-proxy/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("live-proxy.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("live-proxy").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    let limit = self.upstream.batch_limit;
    if limit == 0 || limit > MAX_BATCH_LIMIT {
      return Err(eyre!(
        "upstream.batch_limit must be between 1 and {}, got {}",
        MAX_BATCH_LIMIT,
        limit
      ));
    }
    if self.upstream.batch_timeout_secs == 0 {
      return Err(eyre!("upstream.batch_timeout_secs must be greater than zero"));
    }
    if self.upstream.request_timeout_secs == 0 {
      return Err(eyre!("upstream.request_timeout_secs must be greater than zero"));
    }
    let ttl = self.cache.ttl_secs;
    if ttl == 0 || ttl > MAX_CACHE_TTL_SECS {
      return Err(eyre!(
        "cache.ttl_secs must be between 1 and {}, got {}",
        MAX_CACHE_TTL_SECS,
        ttl
      ));
    }
    if self.server.body_limit == 0 {
      return Err(eyre!("server.body_limit must be greater than zero"));
    }
    Ok(())
  }

  /// Get the upstream client id.
  ///
  /// Checks LIVE_PROXY_CLIENT_ID, then TWITCH_CLIENT_ID, then the config file.
  pub fn client_id(&self) -> Result<String> {
    std::env::var("LIVE_PROXY_CLIENT_ID")
      .or_else(|_| std::env::var("TWITCH_CLIENT_ID"))
      .ok()
      .or_else(|| self.upstream.client_id.clone())
      .filter(|id| !id.trim().is_empty())
      .ok_or_else(|| {
        eyre!(
          "Client id not found. Set upstream.client_id or the LIVE_PROXY_CLIENT_ID environment variable."
        )
      })
  }

  /// Get the upstream client secret from environment variables.
  ///
  /// Checks LIVE_PROXY_CLIENT_SECRET first, then TWITCH_CLIENT_SECRET as fallback.
  pub fn get_client_secret() -> Result<String> {
    std::env::var("LIVE_PROXY_CLIENT_SECRET")
      .or_else(|_| std::env::var("TWITCH_CLIENT_SECRET"))
      .map_err(|_| {
        eyre!(
          "Client secret not found. Set LIVE_PROXY_CLIENT_SECRET or TWITCH_CLIENT_SECRET environment variable."
        )
      })
  }
}
