//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failure is transient (network I/O, timeouts, rate limits)
//! - Re-run the operation after a delay, up to a bounded number of attempts
//! - Propagate the last failure unchanged once attempts are exhausted
//!
//! # Design Decisions
//! - Non-transient failures (node rejections, malformed responses) are
//!   returned on first occurrence
//! - Fixed delay by default, exponential backoff opt-in
//! - Each retried failure is logged once, with attempt counts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::blockchain::types::RpcFailure;
use crate::config::schema::RetryConfig;
use crate::resilience::backoff::Backoff;

/// Failures that may succeed when repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for RpcFailure {
    fn is_transient(&self) -> bool {
        RpcFailure::is_transient(self)
    }
}

/// Bounded retry-on-transient-failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub delay: Duration,
    pub backoff: Backoff,
    /// Cap for exponential backoff.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Fixed delay between a bounded number of attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
            max_delay: delay,
        }
    }

    /// Delay to wait after `attempt` failed attempts.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt, self.delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: Duration::from_millis(config.delay_ms),
            backoff: config.backoff,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Run `operation` under `policy`.
///
/// The closure is invoked once per attempt; it is called at most
/// `policy.max_attempts` times and exactly once when the first failure is
/// not transient.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient RPC failure, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(operation, attempt, max_attempts, error = %e, "Giving up");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    /// Fails transiently `failures` times, then succeeds.
    async fn flaky(calls: &AtomicU32, failures: u32) -> Result<&'static str, RpcFailure> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            Err(RpcFailure::Connection("connection refused".into()))
        } else {
            Ok("ok")
        }
    }

    #[tokio::test]
    async fn test_succeeds_when_attempts_exceed_failures() {
        for k in 0..4 {
            let calls = AtomicU32::new(0);
            let result = retry(&policy(k + 1), "flaky", || flaky(&calls, k)).await;
            assert_eq!(result, Ok("ok"));
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test]
    async fn test_fails_when_failures_reach_attempts() {
        for (n, k) in [(1, 1), (2, 3), (3, 3)] {
            let calls = AtomicU32::new(0);
            let result = retry(&policy(n), "flaky", || flaky(&calls, k)).await;
            assert_eq!(result, Err(RpcFailure::Connection("connection refused".into())));
            assert_eq!(calls.load(Ordering::SeqCst), n);
        }
    }

    #[tokio::test]
    async fn test_non_transient_bypasses_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RpcFailure> = retry(&policy(5), "send", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RpcFailure::Rejected {
                    code: -32000,
                    message: "nonce too low".into(),
                    retryable: false,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(RpcFailure::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_delay_between_attempts() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
        let _ = retry(&policy, "flaky", || flaky(&calls, 2)).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(policy.backoff, Backoff::Fixed);
    }
}
