//! HTTP surface consumed by the browser extension.

pub mod cors;
mod routes;
mod state;
pub mod validation;

pub use routes::{create_router, ChannelStatusBody, LenientJson, PARTIAL_FAILURE_HEADER};
pub use state::AppState;
