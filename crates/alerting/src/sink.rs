//! Audible alert sinks

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::{AlertError, AlertEvent};

/// Plays (or otherwise surfaces) an alert.
///
/// Failures are reported to the caller and never stop a run.
pub trait AlertSink: Send {
    fn play_alert(&mut self, event: &AlertEvent) -> Result<(), AlertError>;
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn play_alert(&mut self, event: &AlertEvent) -> Result<(), AlertError> {
        (**self).play_alert(event)
    }
}

/// Writes every alert to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn play_alert(&mut self, event: &AlertEvent) -> Result<(), AlertError> {
        warn!(
            "DROWSINESS ALERT at frame {} ({} drowsy frames so far)",
            event.frame_index, event.drowsy_count
        );
        Ok(())
    }
}

/// Plays a buzzer sound file through an external audio player.
///
/// Blocks until the player exits, so it belongs behind an
/// [`AlertDispatcher`](crate::AlertDispatcher). A non-zero exit status is a
/// playback failure.
#[derive(Debug, Clone)]
pub struct BuzzerSink {
    sound_path: PathBuf,
    player: String,
}

impl BuzzerSink {
    pub fn new(sound_path: impl Into<PathBuf>, player: impl Into<String>) -> Self {
        Self {
            sound_path: sound_path.into(),
            player: player.into(),
        }
    }
}

impl AlertSink for BuzzerSink {
    fn play_alert(&mut self, event: &AlertEvent) -> Result<(), AlertError> {
        std::fs::File::open(&self.sound_path).map_err(|e| {
            AlertError::SinkFailure(format!(
                "could not open buzzer sound {}: {}",
                self.sound_path.display(),
                e
            ))
        })?;

        let mut parts = self.player.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AlertError::SinkFailure("no audio player configured".into()))?;

        let status = Command::new(program)
            .args(parts)
            .arg(&self.sound_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AlertError::SinkFailure(format!("could not start {}: {}", program, e)))?;

        if !status.success() {
            return Err(AlertError::SinkFailure(format!(
                "{} could not play {}: {}",
                program,
                self.sound_path.display(),
                status
            )));
        }

        debug!("Buzzer played for frame {}", event.frame_index);
        Ok(())
    }
}

/// Keeps every delivered alert in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AlertEvent>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records the attempt and then reports failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Alerts recorded so far, in delivery order
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AlertSink for RecordingSink {
    fn play_alert(&mut self, event: &AlertEvent) -> Result<(), AlertError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(*event);
        }
        if self.fail {
            Err(AlertError::SinkFailure("speaker unavailable".into()))
        } else {
            Ok(())
        }
    }
}
