//! Backoff configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::backoff::{MAX_RETRY_DELAY, MIN_RETRY_DELAY};

/// Bounds for [`ExponentialBackoff`](super::ExponentialBackoff)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Floor applied to every retry delay, in milliseconds
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Ceiling the doubling delay is clamped to, in milliseconds
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_min_delay_ms() -> u64 {
    MIN_RETRY_DELAY.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    MAX_RETRY_DELAY.as_millis() as u64
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffConfig {
    /// Get the floor as a Duration
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Get the ceiling as a Duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Check the bounds are usable
    pub fn validate(&self) -> eyre::Result<()> {
        if self.min_delay_ms == 0 {
            return Err(eyre::eyre!("backoff min-delay-ms must be greater than zero"));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(eyre::eyre!(
                "backoff min-delay-ms ({}) exceeds max-delay-ms ({})",
                self.min_delay_ms,
                self.max_delay_ms
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackoffConfig::default();
        assert_eq!(config.min_delay(), Duration::from_secs(30));
        assert_eq!(config.max_delay(), Duration::from_secs(30 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: BackoffConfig = serde_yaml::from_str("min-delay-ms: 250").unwrap();
        assert_eq!(config.min_delay(), Duration::from_millis(250));
        assert_eq!(config.max_delay(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let zero = BackoffConfig {
            min_delay_ms: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let inverted = BackoffConfig {
            min_delay_ms: 10_000,
            max_delay_ms: 1_000,
        };
        let err = inverted.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }
}
