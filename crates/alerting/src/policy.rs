//! Alert policies

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::AlertError;

/// When a drowsy classification fires an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// Every n-th drowsy classification of the run
    CountThreshold(NonZeroU32),
    /// Every drowsy classification
    Immediate,
    /// A drowsy classification, if at least this long since the last alert
    Cooldown(Duration),
}

impl AlertPolicy {
    pub fn count_threshold(n: u32) -> Result<Self, AlertError> {
        NonZeroU32::new(n)
            .map(AlertPolicy::CountThreshold)
            .ok_or_else(|| AlertError::InvalidPolicy("count threshold must be positive".into()))
    }

    pub fn cooldown(period: Duration) -> Result<Self, AlertError> {
        let policy = AlertPolicy::Cooldown(period);
        policy.validate()?;
        Ok(policy)
    }

    /// Reject parameters that cannot drive a rate limiter
    pub fn validate(&self) -> Result<(), AlertError> {
        match self {
            AlertPolicy::Cooldown(period) if period.is_zero() => Err(AlertError::InvalidPolicy(
                "cooldown period must be positive".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for AlertPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertPolicy::CountThreshold(n) => write!(f, "every {} drowsy frames", n),
            AlertPolicy::Immediate => write!(f, "every drowsy frame"),
            AlertPolicy::Cooldown(d) => write!(f, "at most once per {:.1}s", d.as_secs_f64()),
        }
    }
}

/// Serialized form of [`AlertPolicy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    CountThreshold { every: u32 },
    Immediate,
    Cooldown { seconds: f64 },
}

impl TryFrom<PolicyConfig> for AlertPolicy {
    type Error = AlertError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        match config {
            PolicyConfig::CountThreshold { every } => AlertPolicy::count_threshold(every),
            PolicyConfig::Immediate => Ok(AlertPolicy::Immediate),
            PolicyConfig::Cooldown { seconds } => {
                let period = Duration::try_from_secs_f64(seconds).map_err(|_| {
                    AlertError::InvalidPolicy(format!("cooldown of {} seconds", seconds))
                })?;
                AlertPolicy::cooldown(period)
            }
        }
    }
}

impl From<AlertPolicy> for PolicyConfig {
    fn from(policy: AlertPolicy) -> Self {
        match policy {
            AlertPolicy::CountThreshold(n) => PolicyConfig::CountThreshold { every: n.get() },
            AlertPolicy::Immediate => PolicyConfig::Immediate,
            AlertPolicy::Cooldown(d) => PolicyConfig::Cooldown {
                seconds: d.as_secs_f64(),
            },
        }
    }
}
