//! Bounded retry with exponential backoff around external calls.

use charter_core::config::RetrySettings;
use charter_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Longest sleep between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Each attempt runs under `timeout`; transient failures (including
/// timeouts) are retried up to `max_attempts` in total, sleeping
/// `initial_backoff * 2^(attempt-1)`, capped at [`MAX_BACKOFF`], in between.
/// Other errors return at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        }
    }
}

impl RetryPolicy {
    /// Sleep before the attempt following failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |backoff| backoff.min(MAX_BACKOFF))
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout {
                    operation: operation.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && e.is_transient() => {
                    let backoff = self.backoff(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        tracing::error!(operation, attempt, error = %e, "Giving up");
                    }
                    return Err(e);
                }
            }
        }
    }
}
