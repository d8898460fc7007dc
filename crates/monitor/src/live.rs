//! Live camera runs

use alerting::{AlertDispatcher, DispatchSummary, RateLimiter};
use classifier::Classifier;
use frame_source::{FrameEvent, FrameSource, SourceError, SourceHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::run::Run;
use crate::{FrameObserver, LiveConfig, Mode, MonitorError, NoopObserver, RunReport, RunState};

/// Shared "keep running" switch for a live run
#[derive(Debug, Clone)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    /// A flag that starts active
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Ask the run to stop at its next frame boundary
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for ActiveFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Processes an unbounded feed until stopped or the feed fails
pub struct LiveController<C: Classifier> {
    classifier: C,
    limiter: RateLimiter,
    pacing: Duration,
    alerts: AlertDispatcher,
}

impl<C: Classifier> LiveController<C> {
    pub fn new(
        classifier: C,
        config: &LiveConfig,
        alerts: AlertDispatcher,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            classifier,
            limiter: config.rate_limiter()?,
            pacing: config.pacing()?,
            alerts,
        })
    }

    pub async fn run<S: FrameSource>(&mut self, source: S, active: &ActiveFlag) -> RunReport {
        self.run_observed(source, active, &mut NoopObserver).await
    }

    /// Run until `active` is cleared or the feed fails.
    ///
    /// The flag is checked once before each frame; a frame already being
    /// processed always completes. Each frame is followed by the pacing
    /// delay whatever its label.
    pub async fn run_observed<S, O>(
        &mut self,
        source: S,
        active: &ActiveFlag,
        observer: &mut O,
    ) -> RunReport
    where
        S: FrameSource,
        O: FrameObserver + ?Sized,
    {
        let mut source = SourceHandle::acquire(source);
        let mut run = Run::start(Mode::Live, &self.limiter);

        let failure = loop {
            if !active.is_active() {
                info!("Live run stopped after {} frames", run.stats().total_frames);
                break None;
            }

            let frame = match source.next_frame() {
                Ok(FrameEvent::Frame(frame)) => frame,
                Ok(FrameEvent::EndOfStream) => {
                    break Some(MonitorError::Source(SourceError::Read(
                        "camera feed ended".into(),
                    )))
                }
                Err(e) => break Some(e.into()),
            };

            let now = tokio::time::Instant::now().into_std();
            if let Err(e) = run.process(
                &frame,
                &mut self.classifier,
                &mut self.alerts,
                observer,
                now,
            ) {
                break Some(e);
            }

            tokio::time::sleep(self.pacing).await;
        };

        source.release();
        match failure {
            None => run.finish(RunState::Stopped, None),
            Some(e) => run.finish(RunState::Failed, Some(e)),
        }
    }

    /// Stop alert delivery and report its totals
    pub fn close(self) -> DispatchSummary {
        self.alerts.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameOutcome, SessionStats};
    use alerting::{PolicyConfig, RecordingSink};
    use classifier::{Label, ScriptedClassifier};
    use frame_source::{MemorySource, VideoFrame};

    fn live(classifier: ScriptedClassifier, pacing_ms: u64, sink: &RecordingSink) -> LiveController<ScriptedClassifier> {
        LiveController::new(
            classifier,
            &LiveConfig {
                pacing_ms,
                ..Default::default()
            },
            AlertDispatcher::spawn(sink.clone(), 64),
        )
        .unwrap()
    }

    fn feed() -> MemorySource {
        MemorySource::repeating(VideoFrame::solid(8, 8, [40, 40, 40], 0))
    }

    /// Clears `active` once `frames` frames have been processed
    fn stop_after(active: &ActiveFlag, frames: u64) -> impl FnMut(&VideoFrame, &FrameOutcome, &SessionStats) {
        let active = active.clone();
        move |_: &VideoFrame, _: &FrameOutcome, stats: &SessionStats| {
            if stats.total_frames >= frames {
                active.stop();
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_spacing() {
        let sink = RecordingSink::new();
        let classifier = ScriptedClassifier::from_pattern("DDAD").unwrap();
        let mut controller = live(classifier, 2000, &sink);
        let active = ActiveFlag::new();

        // Drowsy at t=0s, 2s, 6s; alert label at 4s
        let report = controller
            .run_observed(feed(), &active, &mut stop_after(&active, 4))
            .await;

        assert_eq!(report.state, RunState::Stopped);
        assert_eq!(report.stats.total_frames, 4);
        assert_eq!(report.stats.drowsy_frames, 3);
        assert_eq!(report.alerts_fired, 2);

        controller.close();
        let frames: Vec<u64> = sink.events().iter().map(|e| e.frame_index).collect();
        assert_eq!(frames, vec![0, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_drowsiness_alerts_every_five_seconds() {
        let sink = RecordingSink::new();
        let mut controller = live(ScriptedClassifier::constant(Label::Drowsy), 300, &sink);
        let active = ActiveFlag::new();

        let report = controller
            .run_observed(feed(), &active, &mut stop_after(&active, 40))
            .await;

        // Frames every 300ms: alerts at 0s, 5.1s and 10.2s
        assert_eq!(report.stats.total_frames, 40);
        assert_eq!(report.alerts_fired, 3);
        controller.close();
        let frames: Vec<u64> = sink.events().iter().map(|e| e.frame_index).collect();
        assert_eq!(frames, vec![0, 17, 34]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_takes_effect_at_next_frame() {
        let sink = RecordingSink::new();
        let classifier = ScriptedClassifier::from_pattern("ADDAD").unwrap();
        let calls = classifier.call_counter();
        let mut controller = live(classifier, 300, &sink);
        let active = ActiveFlag::new();

        let source = feed();
        let released = source.release_flag();
        let report = controller
            .run_observed(source, &active, &mut stop_after(&active, 5))
            .await;

        assert_eq!(report.state, RunState::Stopped);
        assert_eq!(report.stats.total_frames, 5);
        assert_eq!(report.stats.drowsy_frames, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(released.load(Ordering::SeqCst));
        assert!(report.failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_flag_processes_nothing() {
        let sink = RecordingSink::new();
        let classifier = ScriptedClassifier::constant(Label::Drowsy);
        let calls = classifier.call_counter();
        let mut controller = live(classifier, 300, &sink);
        let active = ActiveFlag::new();
        active.stop();

        let report = controller.run(feed(), &active).await;
        assert_eq!(report.state, RunState::Stopped);
        assert_eq!(report.stats, SessionStats::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_failure_is_fatal() {
        let sink = RecordingSink::new();
        let mut controller = live(ScriptedClassifier::constant(Label::Drowsy), 300, &sink);
        let active = ActiveFlag::new();

        let source = MemorySource::blank(3).then_fail(SourceError::Read("webcam unplugged".into()));
        let released = source.release_flag();
        let report = controller.run(source, &active).await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.stats.total_frames, 3);
        assert_eq!(report.alerts_fired, 1);
        assert!(report.failure.unwrap().contains("webcam unplugged"));
        assert!(released.load(Ordering::SeqCst));
        assert!(active.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_end_is_a_failure() {
        let sink = RecordingSink::new();
        let mut controller = live(ScriptedClassifier::constant(Label::Alert), 300, &sink);

        let report = controller.run(MemorySource::blank(2), &ActiveFlag::new()).await;
        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.stats.total_frames, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_is_independent_of_labels() {
        let sink = RecordingSink::new();
        let classifier = ScriptedClassifier::from_pattern("ADADADAD").unwrap();
        let mut controller = live(classifier, 250, &sink);
        let active = ActiveFlag::new();

        let start = tokio::time::Instant::now();
        controller
            .run_observed(feed(), &active, &mut stop_after(&active, 8))
            .await;
        assert_eq!(start.elapsed(), Duration::from_millis(8 * 250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_another_task() {
        let sink = RecordingSink::new();
        let mut controller = live(ScriptedClassifier::constant(Label::Alert), 300, &sink);
        let active = ActiveFlag::new();

        let stopper = {
            let active = active.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1000)).await;
                active.stop();
            })
        };

        let report = controller.run(feed(), &active).await;
        stopper.await.unwrap();
        assert_eq!(report.state, RunState::Stopped);
        // Frames at 0, 300, 600 and 900ms; the check at 1200ms sees the stop
        assert_eq!(report.stats.total_frames, 4);
    }

    #[test]
    fn test_zero_pacing_rejected() {
        let result = LiveController::new(
            ScriptedClassifier::constant(Label::Alert),
            &LiveConfig {
                policy: PolicyConfig::Cooldown { seconds: 5.0 },
                pacing_ms: 0,
            },
            AlertDispatcher::spawn(RecordingSink::new(), 4),
        );
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }
}
