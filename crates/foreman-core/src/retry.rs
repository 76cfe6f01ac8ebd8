//! Bounded retry with exponential backoff for collaborator calls.

use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::{config::RetryConfig, error::CollaboratorError};

/// How many times a collaborator call is attempted and how long to wait
/// between attempts. Only transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

/// Result of a retried call plus the number of attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, CollaboratorError>,
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before the retry that follows `retries_used` earlier retries.
    pub fn backoff(&self, retries_used: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis();
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let max_ms = self.max_backoff.as_millis().max(base_ms);
        let multiplier = 1u128 << retries_used.min(20);
        let millis = base_ms.saturating_mul(multiplier).min(max_ms);
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Runs `call` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let error = match call().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                    }
                }
                Err(error) => error,
            };

            if !error.is_transient() || attempts >= self.max_attempts {
                if error.is_transient() {
                    log::warn!("{label}: giving up after {attempts} attempt(s): {error}");
                }
                return RetryOutcome {
                    result: Err(error),
                    attempts,
                };
            }

            let delay = self.backoff(attempts - 1);
            log::warn!(
                "{label}: attempt {attempts}/{} failed, retrying in {}ms: {error}",
                self.max_attempts,
                delay.as_millis()
            );
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::PermanentKind;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(3),
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(3));
        assert_eq!(RetryPolicy::immediate(3).backoff(4), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = &AtomicU32::new(0);
        let outcome = RetryPolicy::immediate(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CollaboratorError::transient("github", "502 Bad Gateway"))
                } else {
                    Ok("created")
                }
            })
            .await;

        assert_eq!(outcome.result, Ok("created"));
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_keeps_last_error() {
        let calls = &AtomicU32::new(0);
        let outcome: RetryOutcome<()> = RetryPolicy::immediate(3)
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(CollaboratorError::transient("github", format!("timeout #{n}")))
            })
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.result,
            Err(CollaboratorError::transient("github", "timeout #2"))
        );
    }

    #[tokio::test]
    async fn test_permanent_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let outcome: RetryOutcome<()> = RetryPolicy::immediate(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CollaboratorError::permanent(
                    "github",
                    PermanentKind::PermissionDenied,
                    "forbidden",
                ))
            })
            .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
