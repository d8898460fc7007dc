//! One function per monitoring mode

use alerting::DispatchSummary;
use anyhow::Context;
use classifier::ModelClassifier;
use frame_source::{FrameSource, ImageFileSource, ImageSequenceSource, ReplaySource, VideoFrame};
use monitor::{
    ActiveFlag, BatchController, FrameObserver, FrameOutcome, LiveController, NoopObserver,
    RunReport, SessionStats, SnapshotController,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::Settings;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

/// Where a batch run reads its recorded video from
#[derive(Debug, Clone)]
pub enum BatchInput {
    /// Directory of extracted frame images, with an optional nominal fps
    Frames { dir: PathBuf, fps: Option<u32> },
    /// Video file decoded through OpenCV
    Video(PathBuf),
}

/// Where a live run reads its feed from
#[derive(Debug, Clone)]
pub enum LiveInput {
    /// Frame directory replayed in a loop
    Replay(PathBuf),
    /// Local camera device index
    Camera(i32),
}

/// Prints one line per processed frame
#[derive(Debug, Default)]
pub struct FramePrinter;

impl FrameObserver for FramePrinter {
    fn on_frame(&mut self, frame: &VideoFrame, outcome: &FrameOutcome, stats: &SessionStats) {
        let alert = if outcome.fired { "  ** ALERT **" } else { "" };
        println!(
            "frame {:>6}  {:<6}  drowsy {}/{}{}",
            frame.index,
            outcome.classification.label,
            stats.drowsy_frames,
            stats.total_frames,
            alert
        );
    }
}

fn observer(show_frames: bool) -> Box<dyn FrameObserver> {
    if show_frames {
        Box::new(FramePrinter)
    } else {
        Box::new(NoopObserver)
    }
}

fn build_classifier(settings: &Settings) -> anyhow::Result<ModelClassifier> {
    let classifier =
        ModelClassifier::new(settings.classifier.clone()).context("failed to create classifier")?;
    if !classifier.has_model() {
        warn!(
            "Running without a model: every frame is labelled {}",
            settings.classifier.fallback_label
        );
    }
    Ok(classifier)
}

fn open_batch_source(input: &BatchInput) -> anyhow::Result<Box<dyn FrameSource>> {
    match input {
        BatchInput::Frames { dir, fps } => {
            let mut source = ImageSequenceSource::open(dir)
                .with_context(|| format!("could not open frames in {}", dir.display()))?;
            if let Some(fps) = fps {
                source = source.with_frame_rate(*fps);
            }
            info!("Batch input: {} frames from {}", source.len(), dir.display());
            Ok(Box::new(source))
        }
        BatchInput::Video(path) => open_video(path),
    }
}

fn open_live_source(input: &LiveInput) -> anyhow::Result<Box<dyn FrameSource>> {
    match input {
        LiveInput::Replay(dir) => {
            let source = ReplaySource::open(dir)
                .with_context(|| format!("could not open live feed {}", dir.display()))?;
            Ok(Box::new(source))
        }
        LiveInput::Camera(device) => open_camera(*device),
    }
}

#[cfg(feature = "video")]
fn open_video(path: &Path) -> anyhow::Result<Box<dyn FrameSource>> {
    let source = frame_source::VideoFileSource::open(path)
        .with_context(|| format!("could not open video {}", path.display()))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "video"))]
fn open_video(path: &Path) -> anyhow::Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "cannot decode {}: built without the `video` feature",
        path.display()
    )
}

#[cfg(feature = "video")]
fn open_camera(device: i32) -> anyhow::Result<Box<dyn FrameSource>> {
    let source = frame_source::CameraSource::open(device)
        .with_context(|| format!("failed to access camera {}", device))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "video"))]
fn open_camera(device: i32) -> anyhow::Result<Box<dyn FrameSource>> {
    anyhow::bail!("cannot open camera {}: built without the `video` feature", device)
}

/// Process a recorded video to the end
pub async fn run_batch(
    settings: &Settings,
    input: &BatchInput,
    show_frames: bool,
) -> anyhow::Result<RunReport> {
    let classifier = build_classifier(settings)?;
    let mut controller = BatchController::new(
        classifier,
        &settings.monitor.batch,
        settings.alerts.spawn_dispatcher(),
    )?;

    let source = open_batch_source(input)?;
    let report = controller
        .run_observed(source, observer(show_frames).as_mut())
        .await;

    close_alerts(move || controller.close()).await?;
    Ok(report)
}

/// Classify one image
pub async fn run_snapshot(
    settings: &Settings,
    image: &Path,
    show_frames: bool,
) -> anyhow::Result<RunReport> {
    let classifier = build_classifier(settings)?;
    let mut controller = SnapshotController::new(
        classifier,
        &settings.monitor.snapshot,
        settings.alerts.spawn_dispatcher(),
    )?;

    let source = ImageFileSource::open(image).with_context(|| {
        format!("could not open snapshot {}", image.display())
    })?;
    let report = controller
        .run_observed(source, observer(show_frames).as_mut())
        .await;

    close_alerts(move || controller.close()).await?;
    Ok(report)
}

/// Monitor a live feed until Ctrl-C or `duration` seconds
pub async fn run_live(
    settings: &Settings,
    input: &LiveInput,
    duration: Option<f64>,
    show_frames: bool,
) -> anyhow::Result<RunReport> {
    let limit = duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--duration must be a non-negative number of seconds")?;

    let classifier = build_classifier(settings)?;
    let mut controller = LiveController::new(
        classifier,
        &settings.monitor.live,
        settings.alerts.spawn_dispatcher(),
    )?;

    let source = open_live_source(input)?;

    let active = ActiveFlag::new();
    {
        let active = active.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, stopping live tracking");
                active.stop();
            }
        });
    }
    if let Some(limit) = limit {
        let active = active.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            info!("Live tracking time limit reached");
            active.stop();
        });
    }

    let report = controller
        .run_observed(source, &active, observer(show_frames).as_mut())
        .await;

    close_alerts(move || controller.close()).await?;
    Ok(report)
}

/// Drain queued alerts off the runtime. Closing waits for any playback in
/// progress.
async fn close_alerts<F>(close: F) -> anyhow::Result<()>
where
    F: FnOnce() -> DispatchSummary + Send + 'static,
{
    let summary = tokio::task::spawn_blocking(close)
        .await
        .context("alert dispatcher shutdown failed")?;

    if summary.failed > 0 || summary.dropped > 0 {
        warn!(
            "Alerts: {} played, {} failed, {} dropped",
            summary.delivered, summary.failed, summary.dropped
        );
    } else {
        info!("Alerts: {} played", summary.delivered);
    }
    Ok(())
}

/// Format the final report as text lines or pretty JSON
pub fn render_report(report: &RunReport, output: Output) -> anyhow::Result<String> {
    if output == Output::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut lines = vec![
        format!("Run {} ({}): {:?}", report.run_id, report.mode.as_str(), report.state),
        format!("Total Frames: {}", report.stats.total_frames),
        format!("Drowsy Frames Detected: {}", report.stats.drowsy_frames),
        format!("Alert Frames: {}", report.stats.alert_frames()),
        format!("Drowsy Ratio: {:.1}%", report.stats.drowsy_ratio() * 100.0),
        format!("Alerts Fired: {}", report.alerts_fired),
    ];
    if let Some(label) = report.last_label {
        lines.push(format!("Last Prediction: {}", label));
    }
    if let Some(elapsed) = report.duration() {
        lines.push(format!(
            "Duration: {:.2}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        ));
    }
    if let Some(failure) = &report.failure {
        lines.push(format!("Failure: {}", failure));
    }
    Ok(lines.join("\n"))
}

/// Print the final report to stdout
pub fn print_report(report: &RunReport, output: Output) -> anyhow::Result<()> {
    println!("{}", render_report(report, output)?);
    Ok(())
}
