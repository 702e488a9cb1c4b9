//! Retry with exponential backoff for remote calls
//!
//! Every remote call in a run goes through [`RemoteCaller::call`]: a bounded
//! per-call timeout, cancellation racing, and retries for transient errors
//! only. Anything else is returned on first sight.

use crate::error::{Error, Result};
use crate::publish::{CancelSignal, ProgressCallback};
use crate::types::PipelineStep;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Retry policy for remote calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum attempts including the first try (minimum 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Factor applied per further retry
    pub multiplier: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Timeout for a single attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after a failed attempt (1-based)
    ///
    /// `base * multiplier^(attempt-1)`, capped at `max_delay`. A
    /// `Retry-After` hint from the platform raises the delay, still capped.
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = i32::try_from(attempt.max(1) - 1).unwrap_or(i32::MAX);
        let max_secs = self.max_delay.as_secs_f64();
        let secs = (self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent))
            .min(max_secs);
        let delay = Duration::from_secs_f64(secs.max(0.0));
        retry_after.map_or(delay, |hint| delay.max(hint).min(self.max_delay))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Shared wrapper for the remote calls of one run
pub struct RemoteCaller<'a> {
    policy: &'a RetryPolicy,
    cancel: &'a CancelSignal,
    progress: &'a dyn ProgressCallback,
}

impl<'a> RemoteCaller<'a> {
    /// Bundle the policy, cancellation signal and progress sink of a run
    pub const fn new(
        policy: &'a RetryPolicy,
        cancel: &'a CancelSignal,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            policy,
            cancel,
            progress,
        }
    }

    /// Same policy and progress, different cancellation signal
    #[must_use]
    pub const fn with_cancel<'b>(&self, cancel: &'b CancelSignal) -> RemoteCaller<'b>
    where
        'a: 'b,
    {
        RemoteCaller {
            policy: self.policy,
            cancel,
            progress: self.progress,
        }
    }

    /// Run one remote operation under the retry policy
    ///
    /// Exhausting the attempts on a transient error surfaces `Transient`,
    /// whatever the last transient flavour was.
    pub async fn call<F, Fut, T>(&self, step: PipelineStep, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            debug!(%step, operation, attempt, max_attempts, "remote call");

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                r = timeout(self.policy.call_timeout, op()) => r,
            };

            let err = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => Error::Transient(format!(
                    "{operation} timed out after {:?}",
                    self.policy.call_timeout
                )),
            };

            if !err.is_transient() {
                debug!(
                    %step,
                    operation,
                    attempt,
                    error = %err,
                    "remote call failed (non-retryable)"
                );
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!(
                    %step,
                    operation,
                    attempt,
                    error = %err,
                    "giving up after transient failures"
                );
                return Err(Error::Transient(format!(
                    "{operation} failed after {attempt} attempts: {err}"
                )));
            }

            let delay = self
                .policy
                .backoff_delay(attempt, err.retry_after_secs().map(Duration::from_secs));
            warn!(
                %step,
                operation,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure, retrying"
            );
            self.progress.on_retry(step, attempt, delay, &err).await;

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                () = sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
