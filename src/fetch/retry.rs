//! Retry Policy
//!
//! Exponential backoff for rate-limited upstream calls. Only HTTP 429 is
//! retried; every other failure is returned after a single attempt.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_retry2::{Retry, RetryError};
use tracing::warn;

use crate::error::AppError;
use crate::fetch::UpstreamError;

/// Backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first call
    pub max_retries: u32,
    /// Wait before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Backoff schedule handed to the retry driver: one delay per retry.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        let policy = *self;
        (1..=policy.max_retries).map(move |retry| policy.delay_for(retry))
    }

    /// Runs `call` until it succeeds, fails with something other than 429, or
    /// the retry budget is spent.
    ///
    /// Returns the value together with the number of calls made.
    pub async fn run<F, Fut, T>(&self, label: &str, mut call: F) -> Result<(T, u32), AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let attempts = AtomicU32::new(0);
        let max_retries = self.max_retries;

        let result = Retry::spawn(self.strategy(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = call();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_rate_limited() => {
                        if attempt <= max_retries {
                            warn!(key = label, attempt, "upstream rate limited, backing off");
                        }
                        Err(RetryError::Transient {
                            err,
                            retry_after: None,
                        })
                    }
                    Err(err) => Err(RetryError::Permanent(err)),
                }
            }
        })
        .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(value) => Ok((value, attempts)),
            Err(err) if err.is_rate_limited() => Err(AppError::RetriesExhausted {
                attempts,
                message: err.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
