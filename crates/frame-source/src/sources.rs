//! Concrete frame sources

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{FrameEvent, FrameSource, SourceError, VideoFrame};

/// File extensions accepted as frame images
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Default playback rate used to stamp sequence frames
pub const DEFAULT_FRAME_RATE: u32 = 30;

fn decode_image(path: &Path, index: u64, timestamp_ns: u64) -> Result<VideoFrame, SourceError> {
    let img = image::open(path)
        .map_err(|e| SourceError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(VideoFrame::from_rgb_image(img.to_rgb8(), index, timestamp_ns))
}

/// List frame images in a directory, ordered by file name
fn list_frame_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SourceError::Open(format!("{}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| SourceError::Open(format!("{}: {}", dir.display(), e)))?
            .path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_frame && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(SourceError::Empty);
    }
    files.sort();
    Ok(files)
}

/// A single still image, e.g. a camera snapshot
pub struct ImageFileSource {
    path: PathBuf,
    name: String,
    consumed: bool,
}

impl ImageFileSource {
    /// Open an image file. Decoding happens on the first read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SourceError::Open(format!("{}: not a file", path.display())));
        }
        Ok(Self {
            name: format!("image:{}", path.display()),
            path,
            consumed: false,
        })
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        if self.consumed {
            return Ok(FrameEvent::EndOfStream);
        }
        self.consumed = true;
        decode_image(&self.path, 0, 0).map(FrameEvent::Frame)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Frames extracted from a recorded video, one image file per frame
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    frame_interval_ns: u64,
    name: String,
}

impl ImageSequenceSource {
    /// Open a directory of frame images
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let files = list_frame_files(dir)?;
        info!("Opened frame sequence {} ({} frames)", dir.display(), files.len());
        Ok(Self {
            files,
            position: 0,
            frame_interval_ns: 1_000_000_000 / DEFAULT_FRAME_RATE as u64,
            name: format!("sequence:{}", dir.display()),
        })
    }

    /// Override the nominal frame rate used for timestamps
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_interval_ns = 1_000_000_000 / fps.max(1) as u64;
        self
    }

    /// Total number of frames in the sequence
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(FrameEvent::EndOfStream);
        };
        let index = self.position as u64;
        let frame = decode_image(path, index, index * self.frame_interval_ns)?;
        self.position += 1;
        Ok(FrameEvent::Frame(frame))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Unbounded feed that replays a frame directory in a loop.
///
/// Stands in for a cabin camera: it is a handle that must be released,
/// and reads after release fail.
pub struct ReplaySource {
    files: Vec<PathBuf>,
    next_index: u64,
    opened_at: Instant,
    released: bool,
    name: String,
}

impl ReplaySource {
    /// Open a directory to replay
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let files = list_frame_files(dir)?;
        info!("Opened replay feed {} ({} frames per loop)", dir.display(), files.len());
        Ok(Self {
            files,
            next_index: 0,
            opened_at: Instant::now(),
            released: false,
            name: format!("replay:{}", dir.display()),
        })
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        if self.released {
            return Err(SourceError::Read("feed already released".into()));
        }
        let path = &self.files[(self.next_index % self.files.len() as u64) as usize];
        let timestamp_ns = self.opened_at.elapsed().as_nanos() as u64;
        let frame = decode_image(path, self.next_index, timestamp_ns)?;
        self.next_index += 1;
        Ok(FrameEvent::Frame(frame))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.files.clear();
            info!("Replay feed {} released after {} frames", self.name, self.next_index);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory frames with an optional scripted failure at the end.
///
/// Frames are re-indexed in delivery order.
pub struct MemorySource {
    frames: VecDeque<VideoFrame>,
    repeat: Option<VideoFrame>,
    failure: Option<SourceError>,
    next_index: u64,
    released: Arc<AtomicBool>,
}

impl MemorySource {
    /// Finite source over the given frames
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames: frames.into(),
            repeat: None,
            failure: None,
            next_index: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `count` copies of a small blank frame
    pub fn blank(count: usize) -> Self {
        Self::new(vec![VideoFrame::solid(8, 8, [0, 0, 0], 0); count])
    }

    /// Unbounded source repeating one frame
    pub fn repeating(frame: VideoFrame) -> Self {
        let mut source = Self::new(Vec::new());
        source.repeat = Some(frame);
        source
    }

    /// Fail with `error` once the listed frames are exhausted
    pub fn then_fail(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Flag that flips to `true` once the source is released
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }

    fn stamp(&mut self, mut frame: VideoFrame) -> VideoFrame {
        frame.index = self.next_index;
        self.next_index += 1;
        frame
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(SourceError::Read("source already released".into()));
        }
        if let Some(frame) = self.frames.pop_front() {
            return Ok(FrameEvent::Frame(self.stamp(frame)));
        }
        if let Some(frame) = self.repeat.clone() {
            return Ok(FrameEvent::Frame(self.stamp(frame)));
        }
        if let Some(error) = self.failure.take() {
            warn!("Memory source failing after {} frames: {}", self.next_index, error);
            return Err(error);
        }
        debug!("Memory source exhausted after {} frames", self.next_index);
        Ok(FrameEvent::EndOfStream)
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "memory"
    }
}
