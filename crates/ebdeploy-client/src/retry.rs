//! Throttling-aware retry with exponential backoff and jitter.

use std::future::Future;
use std::time::{Duration, Instant};

use ebdeploy_core::DEFAULT_MAX_RETRIES;
use ebdeploy_model::Operation;
use tracing::warn;

use crate::error::ClientResult;
use crate::response::ApiResult;

const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Retries throttled results.
///
/// Attempt `n` (zero-based) waits `2^n * 100ms` plus up to 500ms of jitter.
/// Once `max_retries` retries have been spent, the last throttled result is
/// handed back unchanged; only the caller knows whether that is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// A policy retrying at most `max_retries` times.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// The retry ceiling.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Deterministic part of the delay before retry `attempt`: `2^attempt * 100ms`.
    #[must_use]
    pub fn base_delay(attempt: u32) -> Duration {
        BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Delay before retry `attempt`, in `[2^attempt * 100ms, 2^attempt * 100ms + 500ms)`.
    #[must_use]
    pub fn delay_for(attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_truncation)]
        let jitter = rand::random_range(0..MAX_JITTER.as_millis() as u64);
        Self::base_delay(attempt).saturating_add(Duration::from_millis(jitter))
    }

    /// Run `attempt` until it yields a result that is not throttled, or the
    /// ceiling is reached. Errors (transport, decoding) are never retried.
    pub async fn run<F, Fut>(&self, operation: Operation, mut attempt: F) -> ClientResult<ApiResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<ApiResult>>,
    {
        let started = Instant::now();
        let mut retries = 0u32;

        loop {
            let result = attempt().await?;
            if !result.is_throttled() {
                return Ok(result);
            }
            if retries >= self.max_retries {
                warn!(
                    operation = %operation,
                    retries,
                    elapsed_ms = started.elapsed().as_millis(),
                    "still throttled after exhausting retries"
                );
                return Ok(result);
            }

            let wait = Self::delay_for(retries);
            warn!(
                operation = %operation,
                attempt = retries + 1,
                wait_ms = wait.as_millis(),
                "request throttled, retrying"
            );
            tokio::time::sleep(wait).await;
            retries += 1;
        }
    }
}
