//! Retry decisions for calendar gateway failures

use std::time::Duration;

use duesync_common::RetryStrategy;

use super::ports::GatewayError;

/// What to do after a failed gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then repeat the same call
    RetryAfter(Duration),
    /// Refresh the access token once, then repeat the call
    RefreshToken,
    /// Record the failure and move on
    GiveUp,
}

/// Maps a gateway error and attempt count to a [`RetryDecision`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryStrategy::default())
    }
}

impl RetryPolicy {
    /// Wrap the backoff schedule used for rate limits and transient errors.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self { strategy }
    }

    /// Total tries per gateway call, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.strategy.max_attempts()
    }

    /// Decide after `attempt` calls (1-based) have been made.
    ///
    /// Rate limits honor the provider's `retry_after` when present and fall
    /// back to exponential backoff with jitter. Transient failures use the
    /// same backoff. Both give up once the attempt budget is spent.
    pub fn decide(&self, error: &GatewayError, attempt: u32) -> RetryDecision {
        match error {
            GatewayError::Unauthorized => RetryDecision::RefreshToken,
            GatewayError::RateLimited(_) | GatewayError::Transient(_)
                if !self.strategy.should_retry(attempt) =>
            {
                RetryDecision::GiveUp
            }
            GatewayError::RateLimited(Some(retry_after)) => RetryDecision::RetryAfter(*retry_after),
            GatewayError::RateLimited(None) | GatewayError::Transient(_) => {
                RetryDecision::RetryAfter(self.strategy.get_delay(attempt.saturating_sub(1)))
            }
            GatewayError::NotFound | GatewayError::Permanent(_) => RetryDecision::GiveUp,
        }
    }
}
