//! Bounded retry with configurable backoff
//!
//! Execution failures are retried unless classified non-retryable; after
//! exhausting attempts the last cause is wrapped and surfaced.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SwapError, SwapResult};

/// Backoff curve between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Constant,
    Linear,
    Exponential,
}

/// Retry parameters. Pure value, no lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay slept before the given attempt number (1-based; attempt 1
    /// runs immediately)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let delay = match self.backoff {
            Backoff::Constant => self.initial_delay,
            Backoff::Linear => self.initial_delay.saturating_mul(attempt),
            Backoff::Exponential => self
                .initial_delay
                .saturating_mul(2u32.saturating_pow(attempt - 1)),
        };
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential,
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

/// Run `op` up to `policy.max_attempts` times. Non-retryable failures
/// propagate immediately; exhaustion wraps the last cause.
pub async fn execute_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> SwapResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SwapResult<T>>,
{
    let mut last_error: Option<SwapError> = None;

    for attempt in 1..=policy.max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            debug!("Retrying in {:?} (attempt {}/{})", delay, attempt, policy.max_attempts);
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed: {}",
                    attempt, policy.max_attempts, e
                );
                last_error = Some(e);
            }
        }
    }

    Err(SwapError::ExhaustedRetries {
        attempts: policy.max_attempts,
        source: Box::new(
            last_error.unwrap_or_else(|| SwapError::Internal("no attempts ran".to_string())),
        ),
    })
}
