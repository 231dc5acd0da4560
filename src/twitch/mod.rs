//! Upstream streaming platform: credentials, the streams API and preview images.

pub mod api_types;
pub mod auth;
pub mod client;
pub mod types;

pub use auth::{ClientCredentials, TokenProvider, TokenSource};
pub use client::{HelixClient, PreviewImage, PreviewSource, StreamSource};
pub use types::{Stream, Token};
