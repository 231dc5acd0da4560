//! Channel status resolution.

pub mod batch;
pub mod merge;
pub mod service;

pub use batch::BatchPlanner;
pub use merge::ChannelStatus;
pub use service::{ChannelStatusService, StatusReport, StatusRequest};
