//! Retry, timeout and fallback discipline shared by every signal source

use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use super::{SignalRequest, SignalResult, SignalSource};
use crate::error::Error;
use crate::retry::{RetryExecutor, RetryPolicy};

/// Settles a signal source into a [`SignalResult`], never an error
#[derive(Debug, Clone)]
pub struct SignalRunner {
    retry: RetryExecutor,
    call_timeout: Duration,
}

impl SignalRunner {
    pub fn new(policy: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            retry: RetryExecutor::new(policy),
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Query `source` under the retry policy. Each attempt is bounded by the
    /// call timeout; a malformed payload ends the loop early.
    pub async fn score(&self, source: &dyn SignalSource, request: &SignalRequest<'_>) -> SignalResult {
        let kind = source.kind();
        let call_timeout = self.call_timeout;
        let timeout_ms = call_timeout.as_millis() as u64;
        let started = Instant::now();

        let outcome = self
            .retry
            .run(source.name(), || {
                let call = source.fetch(request);
                async move {
                    match timeout(call_timeout, call).await {
                        Ok(result) => result.and_then(|value| value.validate_for(kind)),
                        Err(_) => Err(Error::Timeout(timeout_ms)),
                    }
                }
            })
            .await;

        let latency = started.elapsed();

        match outcome.result {
            Ok(value) => {
                debug!(
                    signal = %kind,
                    attempts = outcome.attempts,
                    latency_ms = latency.as_millis() as u64,
                    "Signal settled"
                );
                SignalResult::live(kind, value, outcome.attempts, latency)
            }
            Err(e) => {
                warn!(
                    signal = %kind,
                    attempts = outcome.attempts,
                    error = %e,
                    "Signal unavailable, substituting fallback"
                );
                SignalResult::fallback(kind, source.fallback(), outcome.attempts, latency, e.to_string())
            }
        }
    }
}
