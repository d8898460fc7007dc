//! OpenCV-backed sources: recorded video files and local cameras

use opencv::{
    core::{AlgorithmHint, Mat},
    imgproc,
    prelude::*,
    videoio,
};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::{FrameEvent, FrameSource, SourceError, VideoFrame};

/// Convert a BGR capture into an RGB frame
fn mat_to_frame(mat: &Mat, index: u64, timestamp_ns: u64) -> Result<VideoFrame, SourceError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        mat,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| SourceError::Decode(e.to_string()))?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb
        .data_bytes()
        .map_err(|e| SourceError::Decode(e.to_string()))?
        .to_vec();
    Ok(VideoFrame::new(data, width, height, index, timestamp_ns))
}

/// A recorded video file (mp4, avi, mov, ...) decoded frame by frame
pub struct VideoFileSource {
    capture: videoio::VideoCapture,
    buffer: Mat,
    next_index: u64,
    frame_interval_ns: u64,
    name: String,
}

impl VideoFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |reason: String| SourceError::Open(format!("{}: {}", path.display(), reason));

        if !path.is_file() {
            return Err(open_err("not a file".into()));
        }
        let location = path
            .to_str()
            .ok_or_else(|| open_err("path is not valid UTF-8".into()))?;
        let capture = videoio::VideoCapture::from_file(location, videoio::CAP_ANY)
            .map_err(|e| open_err(e.to_string()))?;
        if !capture.is_opened().map_err(|e| open_err(e.to_string()))? {
            return Err(open_err("no decoder accepted the file".into()));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        let fps = if fps > 0.0 { fps } else { crate::sources::DEFAULT_FRAME_RATE as f64 };
        info!("Opened video {} ({:.1} fps)", path.display(), fps);

        Ok(Self {
            capture,
            buffer: Mat::default(),
            next_index: 0,
            frame_interval_ns: (1e9 / fps) as u64,
            name: format!("video:{}", path.display()),
        })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        let read = self
            .capture
            .read(&mut self.buffer)
            .map_err(|e| SourceError::Read(e.to_string()))?;
        if !read || self.buffer.empty() {
            return Ok(FrameEvent::EndOfStream);
        }

        let index = self.next_index;
        let frame = mat_to_frame(&self.buffer, index, index * self.frame_interval_ns)?;
        self.next_index += 1;
        Ok(FrameEvent::Frame(frame))
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to close {}: {}", self.name, e);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A local camera device, e.g. index 0 for the default webcam.
///
/// The device stays open until [`FrameSource::release`]; reads after that
/// fail.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    buffer: Mat,
    next_index: u64,
    opened_at: Instant,
    released: bool,
    name: String,
}

impl CameraSource {
    pub fn open(device: i32) -> Result<Self, SourceError> {
        let open_err = |reason: String| SourceError::Open(format!("camera {}: {}", device, reason));

        let mut capture = videoio::VideoCapture::new(device, videoio::CAP_ANY)
            .map_err(|e| open_err(e.to_string()))?;
        if !capture.is_opened().map_err(|e| open_err(e.to_string()))? {
            return Err(open_err("device not accessible".into()));
        }
        // Keep the latest frame rather than a backlog
        let _ = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);

        info!("Opened camera {}", device);
        Ok(Self {
            capture,
            buffer: Mat::default(),
            next_index: 0,
            opened_at: Instant::now(),
            released: false,
            name: format!("camera:{}", device),
        })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        if self.released {
            return Err(SourceError::Read("camera already released".into()));
        }
        let read = self
            .capture
            .read(&mut self.buffer)
            .map_err(|e| SourceError::Read(e.to_string()))?;
        if !read || self.buffer.empty() {
            return Err(SourceError::Read(format!("{} returned no frame", self.name)));
        }

        let timestamp_ns = self.opened_at.elapsed().as_nanos() as u64;
        let frame = mat_to_frame(&self.buffer, self.next_index, timestamp_ns)?;
        self.next_index += 1;
        Ok(FrameEvent::Frame(frame))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.capture.release() {
            Ok(()) => info!("{} released after {} frames", self.name, self.next_index),
            Err(e) => warn!("Failed to release {}: {}", self.name, e),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_video_is_open_error() {
        let result = VideoFileSource::open("/definitely/not/here.mp4");
        assert!(matches!(result, Err(SourceError::Open(_))));
    }

    #[test]
    fn test_undecodable_video_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"definitely not an mp4 container").unwrap();
        assert!(matches!(
            VideoFileSource::open(&path),
            Err(SourceError::Open(_))
        ));
    }

    #[test]
    fn test_unknown_camera_is_open_error() {
        assert!(matches!(
            CameraSource::open(9999),
            Err(SourceError::Open(_))
        ));
    }

    #[test]
    fn test_solid_mat_converts_to_rgb() {
        use opencv::core::{Scalar, CV_8UC3};

        // BGR (10, 20, 30)
        let bgr = Mat::new_rows_cols_with_default(2, 3, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0))
            .unwrap();
        let frame = mat_to_frame(&bgr, 4, 99).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.index, 4);
        assert_eq!(frame.timestamp_ns, 99);
        assert_eq!(&frame.data[..3], &[30, 20, 10]);
    }
}
