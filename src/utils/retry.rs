//! Bounded backoff for transient provider and store failures.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Classifies errors worth retrying.
///
/// Implemented by `ProviderError` and `StorageError` in `error.rs`;
/// everything else fails fast.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Backoff schedule for [`with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or exhausts `max_attempts`. Returns the last error unchanged.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= config.max_attempts || !error.is_retryable() {
                    return Err(error);
                }
                warn!(attempt, error = %error, "transient failure, backing off");
                sleep(delay + jitter(delay)).await;
                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.multiplier)
                    .min(config.max_delay);
            }
        }
    }
}

/// Clock-derived jitter, up to a quarter of the base delay.
fn jitter(delay: Duration) -> Duration {
    let window = delay.as_millis() as u64 / 4;
    if window == 0 {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    Duration::from_millis(nanos % window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, StorageError};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_timeout_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(5));

        let result = with_retry(&config, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::Timeout)
            } else {
                Ok("embedded")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "embedded");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_error_fails_without_retry() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&RetryConfig::new(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ProviderError::AuthError("bad key".into()))
        })
        .await;

        assert!(matches!(result, Err(ProviderError::AuthError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(2).with_initial_delay(Duration::from_millis(5));

        let result = with_retry(&config, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StorageError::ConnectionError("refused".into()))
        })
        .await;

        assert!(matches!(result, Err(StorageError::ConnectionError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_storage_error_fails_fast() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&RetryConfig::new(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StorageError::UpsertError("invalid point id".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
