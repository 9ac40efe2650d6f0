//! Bounded exponential backoff around provider and tool calls.

use crate::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_JITTER_MS,
    DEFAULT_RETRY_MAX_DELAY_MS,
};
use crate::model::ProviderError;
use crate::tooling::ToolInvokeError;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Classifies a failure for the retry layer.
pub trait Retryable {
    fn is_transient(&self) -> bool;

    /// Lower bound on the next delay requested by the failing side.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        ProviderError::is_transient(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        ProviderError::retry_after(self)
    }
}

impl Retryable for ToolInvokeError {
    fn is_transient(&self) -> bool {
        ToolInvokeError::is_transient(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            jitter: Duration::from_millis(DEFAULT_RETRY_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// `base * 2^retry`, capped at `max_delay`. `retry` starts at 0.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Backoff for `retry`, raised to the failing side's hint. The hint is
    /// capped at `max_delay`.
    fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let base = match hint {
            Some(hint) => self.backoff(retry).max(hint.min(self.max_delay)),
            None => self.backoff(retry),
        };
        base.saturating_add(self.sample_jitter())
    }

    fn sample_jitter(&self) -> Duration {
        let bound = self.jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=bound))
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("{0}")]
    Fatal(E),
    #[error("cancelled")]
    Cancelled,
}

/// Runs `call` until it succeeds, fails with a non-transient error, runs out
/// of attempts, or `cancel` fires. Cancellation interrupts both the call in
/// flight and any backoff sleep.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut call: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            result = call() => result,
        };

        let error = match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            warn!(operation, attempt, %error, "Non-retryable failure");
            return Err(RetryError::Fatal(error));
        }
        if attempt >= max_attempts {
            warn!(operation, attempts = attempt, %error, "Retry attempts exhausted");
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let delay = policy.delay_for(attempt - 1, error.retry_after());
        warn!(
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            %error,
            "Transient failure, backing off"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
