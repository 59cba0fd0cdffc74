//! Scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Admission and pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum concurrently executing items.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    /// Minimum gap between consecutive dispatches, in milliseconds. Zero
    /// disables interval pacing.
    #[serde(default = "default_min_dispatch_interval_ms")]
    pub min_dispatch_interval_ms: u64,
    /// Bounded re-check interval while waiting for a slot, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Base backoff delay, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound on a single backoff delay, in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Priority boost applied on each retry re-admission.
    #[serde(default = "default_priority_escalation")]
    pub priority_escalation: i64,
    /// Retry cap for submissions that do not specify one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: usize,
    /// Timeout budget for submissions that do not specify one, in
    /// milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

fn default_max_concurrent() -> u32 {
    2
}

fn default_min_dispatch_interval_ms() -> u64 {
    1_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_priority_escalation() -> i64 {
    10
}

fn default_max_retries() -> usize {
    3
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            min_dispatch_interval_ms: default_min_dispatch_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            priority_escalation: default_priority_escalation(),
            default_max_retries: default_max_retries(),
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Minimum inter-dispatch gap as a `Duration`.
    #[must_use]
    pub const fn min_dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.min_dispatch_interval_ms)
    }

    /// Slot re-check bound as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Default timeout budget as a `Duration`.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Backoff delay for the given retry ordinal: the base doubled per
    /// retry, capped.
    #[must_use]
    pub fn backoff_delay(&self, retry_count: usize) -> Duration {
        let exponent = u32::try_from(retry_count).unwrap_or(u32::MAX);
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let raw = self.backoff_base_ms.saturating_mul(multiplier);
        Duration::from_millis(raw.min(self.backoff_cap_ms))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.backoff_base_ms == 0 {
            return Err("backoff_base_ms must be greater than 0".into());
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err("backoff_cap_ms must not be below backoff_base_ms".into());
        }
        if self.default_timeout_ms == 0 {
            return Err("default_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.min_dispatch_interval_ms, 1_000);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.priority_escalation, 10);
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.default_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = SchedulerConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let config = SchedulerConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cap_below_base_rejected() {
        let config = SchedulerConfig {
            backoff_base_ms: 5_000,
            backoff_cap_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_interval_is_allowed() {
        let config = SchedulerConfig {
            min_dispatch_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.min_dispatch_interval().is_zero());
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let config = SchedulerConfig::default();
        assert_eq!(config.backoff_delay(1), Duration::from_millis(2_000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(4_000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(8_000));
        assert_eq!(config.backoff_delay(4), Duration::from_millis(16_000));
        // 2^5 seconds would be 32s; the cap holds it at 30s.
        assert_eq!(config.backoff_delay(5), Duration::from_millis(30_000));
        // Large ordinals must not overflow.
        assert_eq!(config.backoff_delay(400), Duration::from_millis(30_000));
    }

    #[test]
    fn from_json_applies_field_defaults() {
        let config = SchedulerConfig::from_json_str(r#"{"max_concurrent": 8}"#).unwrap();
        assert_eq!(config.max_concurrent, 8);
        assert_eq!(config.min_dispatch_interval_ms, 1_000);
        assert_eq!(config.default_timeout_ms, 60_000);
    }

    #[test]
    fn from_json_rejects_invalid_values() {
        assert!(SchedulerConfig::from_json_str(r#"{"max_concurrent": 0}"#).is_err());
        assert!(SchedulerConfig::from_json_str("not json").is_err());
    }
}
