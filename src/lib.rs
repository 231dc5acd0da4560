//! live-proxy - Caching, batching proxy for channel live status
//!
//! Browser extensions ask this service which of their followed channels are
//! live. It answers from a short-lived in-memory cache and fetches only the
//! missing channels from the upstream streams API, in size-bounded batches.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod status;
pub mod twitch;
