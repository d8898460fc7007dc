//! Alerting System
//!
//! Decides when a drowsy classification becomes an audible alert, and
//! delivers alerts without stalling frame processing.

mod config;
mod dispatcher;
mod limiter;
mod policy;
mod sink;

pub use config::{AlertConfig, SinkKind};
pub use dispatcher::{AlertDispatcher, DispatchSummary};
pub use limiter::{decide, Decision, RateLimiter, RateLimiterState};
pub use policy::{AlertPolicy, PolicyConfig};
pub use sink::{AlertSink, BuzzerSink, LogSink, RecordingSink};

use std::time::Instant;
use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error("Invalid alert policy: {0}")]
    InvalidPolicy(String),

    #[error("Alert playback failed: {0}")]
    SinkFailure(String),
}

/// "Play the audible warning now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvent {
    /// Frame whose classification fired the alert
    pub frame_index: u64,
    /// Drowsy classifications seen in the run so far
    pub drowsy_count: u64,
    /// When the rate limiter fired
    pub raised_at: Instant,
}
