//! Single image runs

use alerting::{AlertDispatcher, DispatchSummary, RateLimiter};
use classifier::Classifier;
use frame_source::{FrameEvent, FrameSource, SourceHandle};

use crate::run::Run;
use crate::{FrameObserver, Mode, MonitorError, NoopObserver, RunReport, RunState, SnapshotConfig};

/// Classifies exactly one frame per run
pub struct SnapshotController<C: Classifier> {
    classifier: C,
    limiter: RateLimiter,
    alerts: AlertDispatcher,
}

impl<C: Classifier> SnapshotController<C> {
    pub fn new(
        classifier: C,
        config: &SnapshotConfig,
        alerts: AlertDispatcher,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            classifier,
            limiter: config.rate_limiter()?,
            alerts,
        })
    }

    pub async fn run<S: FrameSource>(&mut self, source: S) -> RunReport {
        self.run_observed(source, &mut NoopObserver).await
    }

    /// Classify the first frame of `source`. Nothing carries over between
    /// invocations.
    pub async fn run_observed<S, O>(&mut self, source: S, observer: &mut O) -> RunReport
    where
        S: FrameSource,
        O: FrameObserver + ?Sized,
    {
        let mut source = SourceHandle::acquire(source);
        let mut run = Run::start(Mode::Snapshot, &self.limiter);

        let result = match source.next_frame() {
            Ok(FrameEvent::Frame(frame)) => {
                let now = tokio::time::Instant::now().into_std();
                run.process(&frame, &mut self.classifier, &mut self.alerts, observer, now)
                    .map(|_| ())
            }
            Ok(FrameEvent::EndOfStream) => Err(MonitorError::NoFrame),
            Err(e) => Err(e.into()),
        };

        source.release();
        match result {
            Ok(()) => run.finish(RunState::Completed, None),
            Err(e) => run.finish(RunState::Failed, Some(e)),
        }
    }

    /// Stop alert delivery and report its totals
    pub fn close(self) -> DispatchSummary {
        self.alerts.close()
    }
}
