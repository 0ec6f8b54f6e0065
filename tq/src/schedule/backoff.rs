//! Truncated binary exponential backoff

use std::time::Duration;

use crate::clock::FAR_FUTURE;

use super::config::BackoffConfig;

/// Minimum delay applied to operation retries
pub const MIN_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Maximum delay applied to operation retries; delays back off up to this ceiling
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30 * 60);

/// Delay generator for operations that may be rescheduled
///
/// Each call to [`delay`](Self::delay) returns the delay to use for this
/// scheduling and advances the state for the next one. A fresh instance
/// yields the floor twice and then doubles up to the ceiling:
/// 30s, 30s, 1m, 2m, 4m, 8m, 16m, 30m, 30m, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    current: Duration,
    min: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Backoff between [`MIN_RETRY_DELAY`] and [`MAX_RETRY_DELAY`]
    pub fn new() -> Self {
        Self::with_bounds(MIN_RETRY_DELAY, MAX_RETRY_DELAY)
    }

    /// Backoff with a custom floor and ceiling
    ///
    /// A ceiling below the floor is raised to it. Both bounds are capped at
    /// [`FAR_FUTURE`].
    pub fn with_bounds(min: Duration, max: Duration) -> Self {
        let min = min.min(FAR_FUTURE);
        Self {
            current: Duration::ZERO,
            min,
            max: max.min(FAR_FUTURE).max(min),
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::with_bounds(config.min_delay(), config.max_delay())
    }

    /// Delay to use now
    pub fn delay(&mut self) -> Duration {
        if self.current < self.min {
            self.current = self.min;
            return self.min;
        }

        let previous = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        previous
    }

    /// Stored state; zero until the first call to [`delay`](Self::delay)
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Forget accumulated backoff, e.g. after a retried operation succeeds
    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
