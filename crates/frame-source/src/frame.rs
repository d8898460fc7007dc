//! Video frame type and pixel helpers

use image::{imageops, imageops::FilterType, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Source-relative index, monotonic within a run
    pub index: u64,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: u64, timestamp_ns: u64) -> Self {
        Self {
            data,
            width,
            height,
            index,
            timestamp_ns,
        }
    }

    /// Uniformly filled frame, mostly useful for tests and synthetic feeds
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], index: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(data, width, height, index, 0)
    }

    /// Wrap a decoded image
    pub fn from_rgb_image(img: RgbImage, index: u64, timestamp_ns: u64) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            index,
            timestamp_ns,
        }
    }

    /// Copy the pixels into an `image` buffer
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Resize frame using triangle filtering.
    ///
    /// Returns `None` if the pixel buffer does not match the frame dimensions.
    pub fn resize(&self, new_width: u32, new_height: u32) -> Option<VideoFrame> {
        let img = self.to_rgb_image()?;
        let resized = imageops::resize(&img, new_width, new_height, FilterType::Triangle);
        Some(VideoFrame::from_rgb_image(resized, self.index, self.timestamp_ns))
    }
}
