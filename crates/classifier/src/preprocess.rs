//! Model input preparation

use frame_source::VideoFrame;
use ndarray::Array4;

use crate::ClassifierError;

/// Resize to `size x size` and scale to `0..=1`.
///
/// Layout is NHWC with a batch of one: `(1, size, size, 3)`.
pub fn preprocess(frame: &VideoFrame, size: u32) -> Result<Array4<f32>, ClassifierError> {
    let resized = frame.resize(size, size).ok_or_else(|| {
        ClassifierError::ImageProcessing(format!(
            "frame {} buffer does not match {}x{}",
            frame.index, frame.width, frame.height
        ))
    })?;

    let edge = size as usize;
    let mut input = Array4::<f32>::zeros((1, edge, edge, 3));
    for (i, pixel) in resized.data.chunks_exact(3).enumerate() {
        let (y, x) = (i / edge, i % edge);
        input[[0, y, x, 0]] = pixel[0] as f32 / 255.0;
        input[[0, y, x, 1]] = pixel[1] as f32 / 255.0;
        input[[0, y, x, 2]] = pixel[2] as f32 / 255.0;
    }
    Ok(input)
}
