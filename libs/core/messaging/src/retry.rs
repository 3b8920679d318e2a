//! Composable retry policy with a reconnect hook.

use crate::error::Retryable;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff strategy for retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),

    /// Exponential backoff (base * 2^retry, capped at max)
    Exponential { base: Duration, max: Duration },

    /// Linear backoff (base * (retry + 1), capped at max)
    Linear { base: Duration, max: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(d) => *d,
            BackoffStrategy::Exponential { base, max } => {
                let delay = base.saturating_mul(2u32.saturating_pow(retry));
                delay.min(*max)
            }
            BackoffStrategy::Linear { base, max } => {
                let delay = base.saturating_mul(retry.saturating_add(1));
                delay.min(*max)
            }
        }
    }
}

/// Retry policy: how many attempts, how long to wait between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    /// Three attempts, one second apart.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Fixed(Duration::from_secs(1)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `operation`, retrying retryable failures.
    ///
    /// Before every retry the policy sleeps for the backoff delay and then
    /// calls `reconnect`; the whole operation is resubmitted afterwards. A
    /// failed reconnect consumes an attempt. Non-retryable errors and the
    /// error of the last attempt are returned as-is.
    pub async fn run<T, E, Op, OpFut, Re, ReFut>(
        &self,
        mut operation: Op,
        mut reconnect: Re,
    ) -> Result<T, E>
    where
        E: Retryable + Display,
        Op: FnMut() -> OpFut,
        OpFut: Future<Output = Result<T, E>>,
        Re: FnMut() -> ReFut,
        ReFut: Future<Output = Result<(), E>>,
    {
        let mut attempt = 1;
        let mut result = operation().await;

        loop {
            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !error.is_retryable() || attempt >= self.max_attempts {
                return Err(error);
            }

            let delay = self.backoff.delay(attempt - 1);
            warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, reconnecting before retry"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;

            result = match reconnect().await {
                Ok(()) => operation().await,
                Err(e) => Err(e),
            };
        }
    }
}
