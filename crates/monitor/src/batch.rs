//! Recorded video runs

use alerting::{AlertDispatcher, DispatchSummary, RateLimiter};
use classifier::Classifier;
use frame_source::{FrameEvent, FrameSource, SourceHandle};
use std::time::Duration;

use crate::run::Run;
use crate::{BatchConfig, FrameObserver, Mode, MonitorError, NoopObserver, RunReport, RunState};

/// Processes a finite frame source in order, to the end
pub struct BatchController<C: Classifier> {
    classifier: C,
    limiter: RateLimiter,
    frame_delay: Duration,
    alerts: AlertDispatcher,
}

impl<C: Classifier> BatchController<C> {
    /// Fails if the configured policy is invalid
    pub fn new(
        classifier: C,
        config: &BatchConfig,
        alerts: AlertDispatcher,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            classifier,
            limiter: config.rate_limiter()?,
            frame_delay: config.frame_delay(),
            alerts,
        })
    }

    pub async fn run<S: FrameSource>(&mut self, source: S) -> RunReport {
        self.run_observed(source, &mut NoopObserver).await
    }

    /// Run to the end of `source`, reporting each frame to `observer`
    pub async fn run_observed<S, O>(&mut self, source: S, observer: &mut O) -> RunReport
    where
        S: FrameSource,
        O: FrameObserver + ?Sized,
    {
        let mut source = SourceHandle::acquire(source);
        let mut run = Run::start(Mode::Batch, &self.limiter);

        let failure = loop {
            let frame = match source.next_frame() {
                Ok(FrameEvent::Frame(frame)) => frame,
                Ok(FrameEvent::EndOfStream) => break None,
                Err(e) => break Some(MonitorError::from(e)),
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

            if !self.frame_delay.is_zero() {
                tokio::time::sleep(self.frame_delay).await;
            }
        };

        source.release();
        match failure {
            None => run.finish(RunState::Completed, None),
            Some(e) => run.finish(RunState::Failed, Some(e)),
        }
    }

    /// Stop alert delivery and report its totals
    pub fn close(self) -> DispatchSummary {
        self.alerts.close()
    }
}
