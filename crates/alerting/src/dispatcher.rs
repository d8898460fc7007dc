//! Non-blocking alert delivery

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{AlertEvent, AlertSink};

/// Delivery totals for one dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Alerts the sink played
    pub delivered: u64,
    /// Alerts the sink failed to play
    pub failed: u64,
    /// Alerts dropped because the queue was full
    pub dropped: u64,
}

/// Hands alerts to a sink on a worker thread so playback never stalls the
/// frame loop.
pub struct AlertDispatcher {
    sender: Option<mpsc::Sender<AlertEvent>>,
    worker: Option<JoinHandle<()>>,
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    dropped: u64,
}

impl AlertDispatcher {
    /// Spawn the worker that owns `sink`
    pub fn spawn<S: AlertSink + 'static>(mut sink: S, queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(queue_capacity.max(1));
        let delivered = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();
        let failed_clone = failed.clone();

        let worker = std::thread::Builder::new()
            .name("alert-dispatch".into())
            .spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    match sink.play_alert(&event) {
                        Ok(()) => {
                            delivered_clone.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            failed_clone.fetch_add(1, Ordering::SeqCst);
                            warn!("Could not play alert for frame {}: {}", event.frame_index, e);
                        }
                    }
                }
                debug!("Alert dispatcher channel closed");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to start alert dispatcher: {}", e);
                None
            }
        };

        info!("Alert dispatcher started (queue capacity {})", queue_capacity.max(1));

        Self {
            sender: worker.as_ref().map(|_| tx),
            worker,
            delivered,
            failed,
            dropped: 0,
        }
    }

    /// Queue an alert. Never blocks; a full queue drops the alert.
    pub fn dispatch(&mut self, event: AlertEvent) {
        let Some(sender) = &self.sender else {
            self.dropped += 1;
            warn!("Alert for frame {} dropped: dispatcher not running", event.frame_index);
            return;
        };
        if let Err(e) = sender.try_send(event) {
            self.dropped += 1;
            warn!("Alert for frame {} dropped: {}", event.frame_index, e);
        }
    }

    /// Totals so far. Alerts still queued are not counted yet.
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            delivered: self.delivered.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            dropped: self.dropped,
        }
    }

    /// Drain queued alerts, stop the worker, and report totals
    pub fn close(mut self) -> DispatchSummary {
        self.shutdown();
        self.summary()
    }

    fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Alert dispatcher worker panicked");
            }
        }
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingSink;
    use std::time::Instant;

    fn event(frame_index: u64) -> AlertEvent {
        AlertEvent {
            frame_index,
            drowsy_count: frame_index + 1,
            raised_at: Instant::now(),
        }
    }

    #[test]
    fn test_delivers_in_order() {
        let sink = RecordingSink::new();
        let mut dispatcher = AlertDispatcher::spawn(sink.clone(), 8);
        for i in 0..5 {
            dispatcher.dispatch(event(i));
        }
        let summary = dispatcher.close();

        assert_eq!(summary.delivered, 5);
        assert_eq!(summary.failed, 0);
        let frames: Vec<u64> = sink.events().iter().map(|e| e.frame_index).collect();
        assert_eq!(frames, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sink_failure_is_counted_not_fatal() {
        let sink = RecordingSink::failing();
        let mut dispatcher = AlertDispatcher::spawn(sink.clone(), 4);
        dispatcher.dispatch(event(0));
        dispatcher.dispatch(event(1));
        let summary = dispatcher.close();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.delivered, 0);
        assert_eq!(sink.events().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_playback_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let sound = dir.path().join("buzzer.wav");
        std::fs::write(&sound, b"RIFF").unwrap();

        let mut dispatcher = AlertDispatcher::spawn(crate::BuzzerSink::new(&sound, "false"), 4);
        dispatcher.dispatch(event(0));
        let summary = dispatcher.close();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.delivered, 0);
    }

    #[test]
    fn test_every_alert_is_accounted_for() {
        let sink = RecordingSink::new();
        let mut dispatcher = AlertDispatcher::spawn(sink, 1);
        for i in 0..50 {
            dispatcher.dispatch(event(i));
        }
        let summary = dispatcher.close();
        assert_eq!(summary.delivered + summary.failed + summary.dropped, 50);
    }
}
