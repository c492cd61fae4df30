use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::RetryConfig;

/// Errors that know whether trying again could help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Bounded linear backoff: retry `n` waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn delay_before(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of retries, in which case the last error is returned as is.
///
/// Returns `None` if `cancel` fires first; neither a value nor an error is
/// produced after cancellation.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut operation: F,
) -> Option<Result<T, E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retries = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = operation() => result,
        };

        match result {
            Ok(value) => return Some(Ok(value)),
            Err(e) if !e.is_retryable() => return Some(Err(e)),
            Err(e) if retries >= policy.max_retries => {
                warn!("{} failed after {} retries: {}", what, retries, e);
                return Some(Err(e));
            }
            Err(e) => {
                retries += 1;
                let delay = policy.delay_before(retries);
                warn!(
                    "{} failed (retry {}/{}): {}, retrying in {:?}",
                    what, retries, policy.max_retries, e, delay
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, LoadErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_with_linear_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let started = Instant::now();

        let counter = calls.clone();
        let result = with_retry(&policy(), &token, "load", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(LoadError::transient("busy"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap().unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 3s
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6) && waited < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_retries_with_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let counter = calls.clone();
        let result: Option<Result<(), LoadError>> = with_retry(&policy(), &token, "load", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(LoadError::transient(format!("attempt {}", n)))
            }
        })
        .await;

        let err = result.unwrap().unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Transient);
        assert!(err.to_string().contains("attempt 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_failures_are_not_retried() {
        for fatal in [
            LoadErrorKind::PermissionDenied,
            LoadErrorKind::InvalidArguments,
        ] {
            let calls = Arc::new(AtomicU32::new(0));
            let token = CancellationToken::new();
            let started = Instant::now();

            let counter = calls.clone();
            let result: Option<Result<(), LoadError>> =
                with_retry(&policy(), &token, "load", || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(LoadError::new(fatal, "nope"))
                    }
                })
                .await;

            assert_eq!(result.unwrap().unwrap_err().kind(), fatal);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(started.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_yields_nothing() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let result: Option<Result<(), LoadError>> = with_retry(&policy(), &token, "load", || async {
            Err(LoadError::transient("busy"))
        })
        .await;

        assert!(result.is_none());
    }

    #[test]
    fn test_delays_grow_linearly() {
        let policy = policy();
        assert_eq!(policy.delay_before(1), Duration::from_secs(1));
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(3));
    }
}
