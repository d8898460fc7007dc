//! Frame Sources for Driver Monitoring
//!
//! Provides the frames a monitoring run consumes:
//! - Single still images (snapshot mode)
//! - Ordered frame sequences extracted from a recorded video (batch mode)
//! - An unbounded replayed feed standing in for a cabin camera (live mode)
//! - Recorded video files and local cameras through OpenCV (`video` feature)
//!
//! Every source is driven through [`FrameSource`] and held for the length
//! of a run by a [`SourceHandle`], which releases it on every exit path.

#[cfg(feature = "video")]
pub mod capture;
pub mod frame;
pub mod handle;
pub mod sources;

#[cfg(feature = "video")]
pub use capture::{CameraSource, VideoFileSource};
pub use frame::VideoFrame;
pub use handle::SourceHandle;
pub use sources::{ImageFileSource, ImageSequenceSource, MemorySource, ReplaySource};

use thiserror::Error;

/// Source error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Failed to read frame: {0}")]
    Read(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Source contains no frames")]
    Empty,
}

/// Result of pulling one frame from a source
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// Next frame in source order
    Frame(VideoFrame),
    /// Source is exhausted
    EndOfStream,
}

/// A producer of frames, consumed one at a time by a monitoring run
pub trait FrameSource: Send {
    /// Pull the next frame.
    ///
    /// Finite sources return [`FrameEvent::EndOfStream`] once exhausted.
    /// An error is fatal for the run that is reading the source.
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError>;

    /// Release the underlying handle. Must be idempotent.
    fn release(&mut self) {}

    /// Short name used in logs
    fn name(&self) -> &str;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
