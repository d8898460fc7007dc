//! Per-frame processing shared by every mode

use alerting::{AlertDispatcher, AlertEvent, RateLimiter};
use chrono::Utc;
use classifier::{Classification, Classifier};
use frame_source::VideoFrame;
use metrics::counter;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::{Mode, MonitorError, RunReport, RunState, SessionStats};

/// Result of processing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub classification: Classification,
    /// Whether this frame fired an alert
    pub fired: bool,
}

/// Receives every processed frame, e.g. for display
pub trait FrameObserver {
    fn on_frame(&mut self, frame: &VideoFrame, outcome: &FrameOutcome, stats: &SessionStats);
}

impl<F> FrameObserver for F
where
    F: FnMut(&VideoFrame, &FrameOutcome, &SessionStats),
{
    fn on_frame(&mut self, frame: &VideoFrame, outcome: &FrameOutcome, stats: &SessionStats) {
        self(frame, outcome, stats)
    }
}

/// Observer that ignores every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FrameObserver for NoopObserver {
    fn on_frame(&mut self, _: &VideoFrame, _: &FrameOutcome, _: &SessionStats) {}
}

/// One run's exclusively owned state
pub(crate) struct Run {
    report: RunReport,
    limiter: RateLimiter,
}

impl Run {
    /// Enter `Running` with a fresh rate limiter
    pub(crate) fn start(mode: Mode, template: &RateLimiter) -> Self {
        let mut limiter = template.clone();
        limiter.reset();
        let mut report = RunReport::new(mode);
        report.state = RunState::Running;
        info!(
            "Starting {} run {} ({})",
            mode.as_str(),
            report.run_id,
            limiter.policy()
        );
        Self { report, limiter }
    }

    /// Classify, count, and rate-limit one frame.
    ///
    /// Statistics only change once the frame is classified, so a failed
    /// classification leaves them as they were.
    pub(crate) fn process<C, O>(
        &mut self,
        frame: &VideoFrame,
        classifier: &mut C,
        alerts: &mut AlertDispatcher,
        observer: &mut O,
        now: Instant,
    ) -> Result<FrameOutcome, MonitorError>
    where
        C: Classifier + ?Sized,
        O: FrameObserver + ?Sized,
    {
        let classification = classifier.classify(frame)?;
        let label = classification.label;
        let mode = self.report.mode.as_str();

        self.report.stats.record(label);
        self.report.last_label = Some(label);
        counter!("monitor_frames_total", "mode" => mode).increment(1);
        if label.is_drowsy() {
            counter!("monitor_drowsy_frames_total", "mode" => mode).increment(1);
        }

        let fired = self.limiter.observe(label, now);
        if fired {
            self.report.alerts_fired += 1;
            counter!("monitor_alerts_total", "mode" => mode).increment(1);
            alerts.dispatch(AlertEvent {
                frame_index: frame.index,
                drowsy_count: self.limiter.state().drowsy_count,
                raised_at: now,
            });
        }

        debug!(
            "Frame {}: {} (fired: {}, total: {}, drowsy: {})",
            frame.index,
            label,
            fired,
            self.report.stats.total_frames,
            self.report.stats.drowsy_frames
        );

        let outcome = FrameOutcome {
            classification,
            fired,
        };
        observer.on_frame(frame, &outcome, &self.report.stats);
        Ok(outcome)
    }

    pub(crate) fn stats(&self) -> SessionStats {
        self.report.stats
    }

    /// Enter a terminal state and produce the report
    pub(crate) fn finish(mut self, state: RunState, failure: Option<MonitorError>) -> RunReport {
        debug_assert!(state.is_terminal());
        self.report.state = state;
        self.report.finished_at = Some(Utc::now());
        let stats = self.report.stats;

        match &failure {
            Some(e) => {
                error!(
                    "{} run {} failed after {} frames: {}",
                    self.report.mode.as_str(),
                    self.report.run_id,
                    stats.total_frames,
                    e
                );
                self.report.failure = Some(e.to_string());
            }
            None => info!(
                "{} run {} {:?}: {} frames, {} drowsy, {} alerts",
                self.report.mode.as_str(),
                self.report.run_id,
                state,
                stats.total_frames,
                stats.drowsy_frames,
                self.report.alerts_fired
            ),
        }
        self.report
    }
}
