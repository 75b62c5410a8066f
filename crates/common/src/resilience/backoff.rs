//! Exponential backoff with jitter.
//!
//! The delay for attempt `n` (zero-based) is `base * 2^n`, capped at
//! `max_delay`, then spread by `±jitter_factor / 2` to avoid synchronized
//! retries from many clients.

use std::time::Duration;

use rand::Rng;

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default upper bound for a single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Default jitter factor (fraction of the computed delay).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.3;

const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Retry strategy with configurable exponential backoff and jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryStrategy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryStrategy {
    /// Create a strategy with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total number of attempts (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay used for the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the cap applied to every computed delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound for a single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Calculate delay for a given attempt with exponential backoff and jitter
    pub fn get_delay(&self, attempt: u32) -> Duration {
        self.apply_jitter(self.calculate_exponential_delay(attempt))
    }

    /// Delay without jitter; useful for assertions and logging.
    pub fn calculate_exponential_delay(&self, attempt: u32) -> Duration {
        let base_millis = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_millis = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);

        let exponent = attempt.min(MAX_BACKOFF_EXPONENT);
        let multiplier = 2_u64.saturating_pow(exponent);
        let delay_millis = base_millis.saturating_mul(multiplier).min(max_millis);

        Duration::from_millis(delay_millis)
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 || delay.is_zero() {
            return delay;
        }

        let mut rng = rand::thread_rng();
        let delay_millis = delay.as_millis() as f64;
        let jitter_range = delay_millis * self.jitter_factor;

        let jitter = rng.gen_range(-jitter_range / 2.0..=jitter_range / 2.0);
        let final_millis = (delay_millis + jitter).max(0.0) as u64;

        Duration::from_millis(final_millis).min(self.max_delay)
    }
}
