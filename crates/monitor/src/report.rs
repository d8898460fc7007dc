//! Run lifecycle and final reports

use chrono::{DateTime, Utc};
use classifier::Label;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SessionStats;

/// Operating mode of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Recorded video, processed to the end
    Batch,
    /// One still image
    Snapshot,
    /// Camera feed until stopped
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Batch => "batch",
            Mode::Snapshot => "snapshot",
            Mode::Live => "live",
        }
    }
}

/// Run state machine: `Idle -> Running -> {Completed, Stopped, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    /// Source exhausted (batch) or the single frame done (snapshot)
    Completed,
    /// Live run stopped through its active flag
    Stopped,
    /// Source or classifier failure
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Stopped | RunState::Failed)
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: Mode,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Statistics through the last processed frame
    pub stats: SessionStats,
    /// Alerts the rate limiter fired
    pub alerts_fired: u64,
    /// Label of the last processed frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_label: Option<Label>,
    /// Failure reason for `Failed` runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunReport {
    pub(crate) fn new(mode: Mode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            state: RunState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            stats: SessionStats::default(),
            alerts_fired: 0,
            last_label: None,
            failure: None,
        }
    }

    /// Whether the run reached `Completed` or `Stopped`
    pub fn is_success(&self) -> bool {
        matches!(self.state, RunState::Completed | RunState::Stopped)
    }

    /// Wall time from start to finish
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Stopped.is_terminal());
        assert!(RunState::Failed.is_terminal());
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = RunReport::new(Mode::Batch);
        report.state = RunState::Failed;
        report.stats.record(Label::Drowsy);
        report.failure = Some("Source unavailable: camera".into());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "batch");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["stats"]["total_frames"], 1);
        assert_eq!(json["stats"]["drowsy_frames"], 1);
        assert!(json.get("finished_at").is_none());
        assert!(!report.is_success());
    }
}
