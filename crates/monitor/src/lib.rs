//! Drowsiness Monitoring Runs
//!
//! Drives frames from a source through a classifier and an alert rate
//! limiter, one run at a time:
//! - Batch: a recorded video to completion, alert every 10th drowsy frame
//! - Snapshot: a single image, alert if drowsy
//! - Live: a camera feed until stopped, at most one alert per 5 seconds
//!
//! Every run ends in a [`RunReport`] carrying its session statistics,
//! including runs that fail part way.
//!
//! Frame reads and classification run inline on the task that awaits the
//! controller, strictly one frame at a time. A controller occupies that
//! runtime worker until the run ends, so drive it from a multi-threaded
//! runtime (or its own task) when other async work must stay responsive.

pub mod batch;
pub mod config;
pub mod live;
pub mod report;
mod run;
pub mod snapshot;
pub mod stats;

pub use batch::BatchController;
pub use config::{BatchConfig, LiveConfig, MonitorConfig, SnapshotConfig};
pub use live::{ActiveFlag, LiveController};
pub use report::{Mode, RunReport, RunState};
pub use run::{FrameObserver, FrameOutcome, NoopObserver};
pub use snapshot::SnapshotController;
pub use stats::SessionStats;

use alerting::AlertError;
use classifier::ClassifierError;
use frame_source::SourceError;
use thiserror::Error;

/// Monitoring error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Source unavailable: {0}")]
    Source(#[from] SourceError),

    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Policy(#[from] AlertError),

    #[error("Source produced no frame")]
    NoFrame,

    #[error("Configuration error: {0}")]
    Config(String),
}
