//! Bounded retry with exponential backoff for critique calls.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::SessionConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy from the session's retry settings.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_retries: config.critique_retries,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_delay)
    }
}

/// Final outcome of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    /// Last error, after retries ran out or the error was not retryable
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether the operation eventually succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    /// Total attempts made, including the first.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Discard the attempt count.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or the policy's retries are spent.
pub async fn retry_async<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retries = 0u32;

    loop {
        match operation().await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: retries + 1,
                }
            }
            Err(e) if retries < policy.max_retries && should_retry(&e) => {
                retries += 1;
                let delay = policy.delay_before(retries);
                debug!(
                    operation = operation_name,
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                return RetryOutcome::Failed {
                    error,
                    attempts: retries + 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_before(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(400));
        assert_eq!(policy.delay_before(4), Duration::from_millis(500));
        assert_eq!(policy.delay_before(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(
            &fast(3),
            "test",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(7) }
            },
            |_| true,
        )
        .await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.into_result().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(
            &fast(3),
            "test",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(
            &fast(2),
            "test",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>("down") }
            },
            |_| true,
        )
        .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(
            &fast(5),
            "test",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>("bad key") }
            },
            |e: &&str| *e != "bad key",
        )
        .await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
