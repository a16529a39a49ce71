//! Fixed-delay retry wrapper for fallible provider calls
//!
//! Built on `backoff` with a constant interval. The executor never substitutes
//! a fallback value: once the attempt budget is spent, or a terminal error is
//! seen, the last error is handed back to the caller.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::backoff::Constant;
use backoff::future::retry;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

/// Default number of attempts per provider call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed wait between attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Retry budget shared by all signal sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Attempt budget; zero is treated as a single attempt
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Result of a retried operation plus the number of invocations it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Runs an operation up to `max_attempts` times with a fixed delay in between
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation`, returning the first success or the last error
    pub async fn execute<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(label, operation).await.result
    }

    /// Like [`execute`](Self::execute) but also reports how many attempts were made
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.effective_attempts();
        let attempts = AtomicU32::new(0);

        let result = retry(Constant::new(self.policy.delay()), || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let call = operation();
            async move {
                match call.await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        warn!(
                            operation = label,
                            attempt,
                            max_attempts,
                            error = %e,
                            "Attempt failed"
                        );
                        if e.is_retryable() && attempt < max_attempts {
                            Err(backoff::Error::transient(e))
                        } else {
                            Err(backoff::Error::permanent(e))
                        }
                    }
                }
            }
        })
        .await;

        RetryOutcome {
            result,
            attempts: attempts.load(Ordering::Relaxed),
        }
    }
}
