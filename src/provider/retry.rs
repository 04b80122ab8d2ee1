//! Exponential backoff for transient provider failures.

use super::error::{ProviderError, Result};
use std::future::Future;
use std::time::Duration;

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Run `operation`, retrying retryable errors with exponential backoff.
pub async fn retry_with_backoff<T, F, Fut>(operation: F, config: &RetryConfig) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = config.initial_delay;
    let mut last_err: Option<ProviderError> = None;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                tracing::warn!(
                    "Provider call failed (attempt {}/{}): {} — retrying in {:?}",
                    attempt,
                    config.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(config.max_delay);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or(ProviderError::StreamError("retry exhausted".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };

        let result = retry_with_backoff(
            || async {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::RateLimitExceeded("slow down".into()))
                } else {
                    Ok(42)
                }
            },
            &config,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result: Result<()> = retry_with_backoff(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::InvalidApiKey)
            },
            &config,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
