//! Alert delivery configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{AlertDispatcher, BuzzerSink, LogSink};

/// Where alerts go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Log line only
    #[default]
    Log,
    /// Buzzer sound through an external player
    Buzzer,
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alert sink
    pub sink: SinkKind,
    /// Buzzer sound file (default: buzzer.wav)
    pub sound_path: PathBuf,
    /// Audio player command, the sound path is appended
    pub player: String,
    /// Alerts queued for playback before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Log,
            sound_path: PathBuf::from("buzzer.wav"),
            player: "aplay -q".to_string(),
            queue_capacity: 16,
        }
    }
}

impl AlertConfig {
    /// Start a dispatcher for the configured sink
    pub fn spawn_dispatcher(&self) -> AlertDispatcher {
        match self.sink {
            SinkKind::Log => AlertDispatcher::spawn(LogSink, self.queue_capacity),
            SinkKind::Buzzer => AlertDispatcher::spawn(
                BuzzerSink::new(&self.sound_path, &self.player),
                self.queue_capacity,
            ),
        }
    }
}
