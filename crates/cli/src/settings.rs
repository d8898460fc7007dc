//! Layered application settings

use alerting::AlertConfig;
use anyhow::Context;
use classifier::ClassifierConfig;
use config::{Config, Environment, File};
use monitor::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable prefix, e.g. `DROWSY__MONITOR__LIVE__PACING_MS=200`
pub const ENV_PREFIX: &str = "DROWSY";

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Everything the binary can be configured with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log: LogSettings,
    /// Serve Prometheus metrics on this address when set
    pub metrics_listen: Option<SocketAddr>,
    pub classifier: ClassifierConfig,
    pub alerts: AlertConfig,
    pub monitor: MonitorConfig,
}

impl Settings {
    /// Defaults, then the optional settings file, then environment variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("failed to read settings")?
            .try_deserialize()
            .context("invalid settings")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject invalid values before any run starts
    pub fn validate(&self) -> anyhow::Result<()> {
        self.classifier
            .validate()
            .context("invalid classifier settings")?;
        self.monitor.validate().context("invalid monitor settings")?;
        Ok(())
    }
}
