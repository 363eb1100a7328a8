//! Generative call retry policy
//!
//! Exponential backoff over transient generative-backend failures. Each attempt
//! is bounded by the policy's per-call timeout so one slow call cannot stall a
//! batch.

use crate::generative::{GenerativeBackend, GenerativeError};
use std::time::{Duration, Instant};

/// Retry count, backoff schedule and per-call timeout
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first (>= 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(8000),
            multiplier: 2.0,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Zero-backoff policy for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
            call_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Delay after failed attempt `attempt` (1-based), capped at `max_backoff`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

/// Call `backend.generate(prompt)` under `policy`
///
/// **Algorithm:**
/// 1. Attempt the call, bounded by `call_timeout`
/// 2. On success return the text
/// 3. On a retryable error with attempts left: log WARN, back off, retry
/// 4. On a permanent error or the last attempt: return the error
///
/// # Arguments
/// * `label` - Unit name for logging (layer id)
pub async fn generate_with_retry(
    backend: &dyn GenerativeBackend,
    prompt: &str,
    policy: &RetryPolicy,
    label: &str,
) -> Result<String, GenerativeError> {
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(policy.call_timeout, backend.generate(prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(GenerativeError::Timeout(policy.call_timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(text) => {
                if attempt > 1 {
                    tracing::debug!(
                        unit = label,
                        backend = backend.name(),
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Generative call succeeded after retry"
                    );
                }
                return Ok(text);
            }
            Err(err) => {
                if !err.is_retryable() {
                    tracing::warn!(
                        unit = label,
                        backend = backend.name(),
                        attempt,
                        error = %err,
                        "Generative call failed with permanent error"
                    );
                    return Err(err);
                }

                if attempt >= max_attempts {
                    tracing::warn!(
                        unit = label,
                        backend = backend.name(),
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Generative call failed: retries exhausted"
                    );
                    return Err(err);
                }

                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    unit = label,
                    backend = backend.name(),
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Generative call failed, will retry after backoff"
                );

                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
