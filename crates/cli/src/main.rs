//! Driver Drowsiness Monitor - Main Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use drowsiness_cli::commands::{self, BatchInput, LiveInput, Output};
use drowsiness_cli::{init_logging, init_metrics, Settings};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "drowsiness-monitor", version)]
#[command(about = "Driver drowsiness detection with audible alerts", long_about = None)]
struct Args {
    /// Settings file (TOML, YAML or JSON). DROWSY__* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ONNX drowsiness model; overrides classifier.model_path.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Print the final report as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Print the label of every processed frame.
    #[arg(long, global = true, default_value_t = false)]
    show_frames: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process a recorded video to the end.
    #[command(group(ArgGroup::new("input").required(true).args(["frames", "video"])))]
    Batch {
        /// Directory of frames extracted from the video.
        #[arg(long, value_name = "DIR")]
        frames: Option<PathBuf>,

        /// Video file (mp4, avi, mov, ...). Requires the `video` feature.
        #[arg(long, value_name = "FILE")]
        video: Option<PathBuf>,

        /// Nominal frame rate used for frame-directory timestamps.
        #[arg(long, requires = "frames")]
        fps: Option<u32>,
    },
    /// Classify a single captured image.
    Snapshot {
        #[arg(long)]
        image: PathBuf,
    },
    /// Monitor a live feed until Ctrl-C.
    #[command(group(ArgGroup::new("input").required(true).args(["frames", "camera"])))]
    Live {
        /// Frame directory replayed in a loop as a camera feed.
        #[arg(long, value_name = "DIR")]
        frames: Option<PathBuf>,

        /// Camera device index, e.g. 0 for the default webcam. Requires the `video` feature.
        #[arg(long, value_name = "INDEX")]
        camera: Option<i32>,

        /// Stop after this many seconds.
        #[arg(long)]
        duration: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        settings.classifier.model_path = Some(model);
    }

    init_logging(&settings.log)?;
    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = settings.metrics_listen {
        init_metrics(addr)?;
    }

    let report = match args.command {
        Command::Batch { frames, video, fps } => {
            let input = match (frames, video) {
                (Some(dir), _) => BatchInput::Frames { dir, fps },
                (None, Some(path)) => BatchInput::Video(path),
                (None, None) => anyhow::bail!("batch needs --frames or --video"),
            };
            commands::run_batch(&settings, &input, args.show_frames).await?
        }
        Command::Snapshot { image } => {
            commands::run_snapshot(&settings, &image, args.show_frames).await?
        }
        Command::Live {
            frames,
            camera,
            duration,
        } => {
            let input = match (frames, camera) {
                (Some(dir), _) => LiveInput::Replay(dir),
                (None, Some(device)) => LiveInput::Camera(device),
                (None, None) => anyhow::bail!("live needs --frames or --camera"),
            };
            commands::run_live(&settings, &input, duration, args.show_frames).await?
        }
    };

    let output = if args.json { Output::Json } else { Output::Text };
    commands::print_report(&report, output)?;

    if !report.is_success() {
        anyhow::bail!(
            "{} run failed: {}",
            report.mode.as_str(),
            report.failure.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
