//! Bounded optimistic retry for read-modify-write cycles.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::{BackoffConfig, RetryConfig};

use super::error::DomainError;

/// Runs a read-modify-write closure until it succeeds, fails with a
/// non-retryable error, or runs out of attempts.
///
/// The closure must re-read remote state on every call; a conflict means the
/// previous read is stale.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffConfig,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// non-retryable error.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = calculate_backoff(&self.backoff, attempt);
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay = ?delay,
                        error = %e,
                        "read-modify-write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(
                            operation,
                            attempts = attempt + 1,
                            error = %e,
                            "read-modify-write retries exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Delay before retry number `attempt + 1` (0-indexed `attempt`).
///
/// Non-finite or negative inputs are sanitized instead of panicking in
/// `Duration::from_secs_f64`.
#[must_use]
pub fn calculate_backoff(backoff: &BackoffConfig, attempt: u32) -> Duration {
    let multiplier = if backoff.multiplier.is_finite() && backoff.multiplier >= 0.0 {
        backoff.multiplier
    } else {
        1.0
    };
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let max_secs = backoff.max.as_secs_f64();
    let raw = backoff.initial.as_secs_f64() * multiplier.powi(exponent);
    let secs = if raw.is_finite() { raw.min(max_secs) } else { max_secs };
    let duration = Duration::from_secs_f64(secs.max(0.0));

    if backoff.jitter {
        let jitter_factor = rand::rng().random_range(0.0..=0.25);
        duration + duration.mul_f64(jitter_factor)
    } else {
        duration
    }
}
