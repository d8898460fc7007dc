//! Monitoring configuration

use alerting::{AlertPolicy, PolicyConfig, RateLimiter};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::MonitorError;

/// Batch (recorded video) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Alert policy (default: every 10th drowsy frame)
    pub policy: PolicyConfig,
    /// Delay after each frame, for display playback (0 disables)
    pub frame_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::CountThreshold { every: 10 },
            frame_delay_ms: 0,
        }
    }
}

/// Snapshot (single image) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Alert policy (default: immediate)
    pub policy: PolicyConfig,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::Immediate,
        }
    }
}

/// Live (camera feed) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Alert policy (default: 5 second cooldown)
    pub policy: PolicyConfig,
    /// Minimum delay between frames (milliseconds)
    pub pacing_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::Cooldown { seconds: 5.0 },
            pacing_ms: 300,
        }
    }
}

/// Monitoring configuration for all three modes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub batch: BatchConfig,
    pub snapshot: SnapshotConfig,
    pub live: LiveConfig,
}

impl MonitorConfig {
    /// Check every mode's settings without building controllers
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.batch.rate_limiter()?;
        self.snapshot.rate_limiter()?;
        self.live.rate_limiter()?;
        self.live.pacing()?;
        Ok(())
    }
}

fn rate_limiter(policy: &PolicyConfig) -> Result<RateLimiter, MonitorError> {
    let policy = AlertPolicy::try_from(policy.clone())?;
    Ok(RateLimiter::new(policy)?)
}

impl BatchConfig {
    pub(crate) fn rate_limiter(&self) -> Result<RateLimiter, MonitorError> {
        rate_limiter(&self.policy)
    }

    pub(crate) fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

impl SnapshotConfig {
    pub(crate) fn rate_limiter(&self) -> Result<RateLimiter, MonitorError> {
        rate_limiter(&self.policy)
    }
}

impl LiveConfig {
    pub(crate) fn rate_limiter(&self) -> Result<RateLimiter, MonitorError> {
        rate_limiter(&self.policy)
    }

    pub(crate) fn pacing(&self) -> Result<Duration, MonitorError> {
        if self.pacing_ms == 0 {
            return Err(MonitorError::Config("live pacing_ms must be positive".into()));
        }
        Ok(Duration::from_millis(self.pacing_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            *config.batch.rate_limiter().unwrap().policy(),
            AlertPolicy::count_threshold(10).unwrap()
        );
        assert_eq!(
            *config.snapshot.rate_limiter().unwrap().policy(),
            AlertPolicy::Immediate
        );
        assert_eq!(
            *config.live.rate_limiter().unwrap().policy(),
            AlertPolicy::Cooldown(Duration::from_secs(5))
        );
        assert_eq!(config.live.pacing().unwrap(), Duration::from_millis(300));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = MonitorConfig::default();
        config.batch.policy = PolicyConfig::CountThreshold { every: 0 };
        assert!(matches!(config.validate(), Err(MonitorError::Policy(_))));

        let mut config = MonitorConfig::default();
        config.live.pacing_ms = 0;
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_partial_json() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{ "live": { "pacing_ms": 100 }, "batch": { "policy": { "kind": "immediate" } } }"#,
        )
        .unwrap();
        assert_eq!(config.live.pacing_ms, 100);
        assert_eq!(config.live.policy, PolicyConfig::Cooldown { seconds: 5.0 });
        assert_eq!(config.batch.policy, PolicyConfig::Immediate);
        assert_eq!(config.batch.frame_delay_ms, 0);
    }
}
