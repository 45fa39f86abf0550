//! Quota-aware retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::ExtractError;

/// Backoff parameters for [`with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Add a uniform random delay in `[0, base_delay)` to each wait.
    pub jitter: bool,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            jitter: true,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately, for tests and offline runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            jitter: false,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let mut delay = self.base_delay.saturating_mul(factor);
        if self.jitter {
            let base_ms = self.base_delay.as_millis() as u64;
            if base_ms > 0 {
                delay += Duration::from_millis(rand::thread_rng().gen_range(0..base_ms));
            }
        }
        delay.min(self.max_delay)
    }
}

/// Run `op`, retrying while it fails with a quota error.
///
/// Non-quota errors are returned after the first failing attempt. Once the
/// retry ceiling is reached the last quota error is reported as
/// [`ExtractError::QuotaExceeded`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ExtractError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtractError>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_quota() => return Err(e),
            Err(e) if retries >= policy.max_retries => {
                warn!(attempts = retries + 1, error = %e, "quota retries exhausted");
                return Err(ExtractError::QuotaExceeded {
                    attempts: retries + 1,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let delay = policy.delay_for(retries);
                warn!(
                    attempt = retries + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "quota error, backing off"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
        }
    }
}
