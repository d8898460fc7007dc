//! Driver Drowsiness Monitor
//!
//! Command-line front end: loads settings, wires sources, classifier and
//! alert sink together, and runs one monitoring mode.

pub mod commands;
pub mod settings;

pub use settings::{LogSettings, Settings};

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("invalid log level '{}'", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("failed to set tracing subscriber")
}

/// Serve Prometheus metrics on `addr`
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}
