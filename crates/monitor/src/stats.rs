//! Session statistics

use classifier::Label;
use serde::{Deserialize, Serialize};

/// Frame counts for one run.
///
/// `drowsy_frames <= total_frames` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Frames classified
    pub total_frames: u64,
    /// Frames classified drowsy
    pub drowsy_frames: u64,
}

impl SessionStats {
    /// Account for one classified frame
    pub fn record(&mut self, label: Label) {
        self.total_frames += 1;
        if label.is_drowsy() {
            self.drowsy_frames += 1;
        }
        debug_assert!(self.drowsy_frames <= self.total_frames);
    }

    /// Share of drowsy frames, 0.0 for an empty run
    pub fn drowsy_ratio(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.drowsy_frames as f64 / self.total_frames as f64
        }
    }

    pub fn alert_frames(&self) -> u64 {
        self.total_frames - self.drowsy_frames
    }
}
