//! Retry ceiling and backoff schedule for page requests

use std::time::Duration;

/// Retry configuration applied to every page request
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page request, including the first one
    pub max_attempts: u32,
    /// Backoff before the first retry of a transient failure
    pub initial_backoff: Duration,
    /// Upper bound for exponential backoff
    pub max_backoff: Duration,
    /// Cool-down after a rate-limit response that carries no hint
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            rate_limit_cooldown: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy without any waiting, for tests and replay
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Exponential backoff after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1u32 << exponent);
        delay.min(self.max_backoff)
    }

    /// Cool-down after a rate-limit response.
    ///
    /// A `Retry-After` hint is honoured up to the larger of `max_backoff` and
    /// `rate_limit_cooldown`.
    pub fn rate_limit_delay(&self, hint: Option<Duration>) -> Duration {
        let ceiling = self.max_backoff.max(self.rate_limit_cooldown);
        hint.map_or(self.rate_limit_cooldown, |hint| hint.min(ceiling))
    }
}
