//! Retry orchestration for rate-limited requests.
//!
//! Only [`ErrorKind::RateLimited`](crate::ErrorKind::RateLimited) failures are
//! retried. Every other outcome is returned after a single invocation.

use std::{future::Future, time::Duration};

use backon::{BackoffBuilder, Retryable};
use tracing::warn;

use crate::error::Error;

/// Delays before the first, second, third and later retries.
pub const DEFAULT_DELAYS: [Duration; 4] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

/// Retries granted after the first attempt by [`RetryPolicy::default`].
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// How many times to retry a rate-limited operation, and how long to wait.
///
/// The delay before retry `n` (1-based) is `delays[min(n - 1, len - 1)]`;
/// once retries outnumber the delays the last delay is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DELAYS.to_vec(), DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, max_retries: usize) -> Self {
        Self { delays, max_retries }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(Vec::new(), 0)
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: usize) -> Duration {
        let Some(last) = self.delays.len().checked_sub(1) else {
            return Duration::ZERO;
        };
        self.delays[retry.saturating_sub(1).min(last)]
    }

    pub fn schedule(&self) -> DelaySchedule {
        DelaySchedule {
            policy: self.clone(),
            issued: 0,
        }
    }
}

impl BackoffBuilder for RetryPolicy {
    type Backoff = DelaySchedule;

    fn build(self) -> Self::Backoff {
        DelaySchedule {
            policy: self,
            issued: 0,
        }
    }
}

/// Iterator over the delays of a [`RetryPolicy`]; yields one per retry.
#[derive(Debug, Clone)]
pub struct DelaySchedule {
    policy: RetryPolicy,
    issued: usize,
}

impl Iterator for DelaySchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.issued >= self.policy.max_retries {
            return None;
        }
        self.issued += 1;
        Some(self.policy.delay_for(self.issued))
    }
}

/// Runs `op`, retrying it while it fails with a rate-limit error.
///
/// On persistent rate limiting `op` runs `max_retries + 1` times and the last
/// error is returned. Any other error is returned unchanged after the first
/// invocation.
///
/// # Errors
///
/// Returns the error of the final invocation of `op`.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    op.retry(policy.clone())
        .sleep(tokio::time::sleep)
        .when(Error::is_rate_limited)
        .notify(|err: &Error, delay: Duration| {
            warn!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                retry_after_secs = err.retry_after().map(|hint| hint.as_secs()),
                error = %err,
                "Rate limited, backing off"
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Instant,
    };

    use super::*;

    fn rate_limited() -> Error {
        Error::RateLimited {
            message: "API rate limit exceeded".to_string(),
            retry_after: None,
        }
    }

    fn millis(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn test_default_schedule_doubles_then_stops() {
        let delays: Vec<_> = RetryPolicy::default().schedule().collect();
        assert_eq!(delays, DEFAULT_DELAYS[..3].to_vec());
    }

    #[test]
    fn test_schedule_reuses_last_delay() {
        let policy = RetryPolicy::new(millis(&[1, 2]), 4);
        let delays: Vec<_> = policy.schedule().collect();
        assert_eq!(delays, millis(&[1, 2, 2, 2]));
    }

    #[test]
    fn test_schedule_with_empty_delays_waits_zero() {
        let policy = RetryPolicy::new(Vec::new(), 2);
        let delays: Vec<_> = policy.schedule().collect();
        assert_eq!(delays, vec![Duration::ZERO, Duration::ZERO]);
    }

    #[test]
    fn test_with_max_retries_keeps_delays() {
        let delays: Vec<_> = RetryPolicy::default().with_max_retries(1).schedule().collect();
        assert_eq!(delays, vec![DEFAULT_DELAYS[0]]);
    }

    #[test]
    fn test_none_policy_yields_no_delays() {
        assert_eq!(RetryPolicy::none().schedule().count(), 0);
    }

    #[tokio::test]
    async fn test_with_retry_persistent_rate_limit_invokes_max_retries_plus_one() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(millis(&[1, 1]), 3);

        let result: Result<(), Error> = with_retry(&policy, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            }
        })
        .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_with_retry_other_error_invokes_once_and_returns_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(millis(&[1]), 5);

        let result: Result<(), Error> = with_retry(&policy, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::not_found("Could not resolve to a node"))
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(&err, Error::NotFound { message } if message == "Could not resolve to a node"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_success_invokes_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let value = with_retry(&RetryPolicy::default(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_after_rate_limits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(millis(&[1, 1]), 3);
        let started = Instant::now();

        let value = with_retry(&policy, || {
            let calls = Arc::clone(&calls);
            async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(rate_limited())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_with_retry_zero_retries_invokes_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), Error> = with_retry(&RetryPolicy::none(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
