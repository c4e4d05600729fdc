//! Retry with exponential backoff.
//!
//! One policy type is shared by every fallible step that talks to the outside
//! world: decoding template images, encoding the final PNG, and calling the
//! text-generation API. Callers decide which errors are worth another attempt
//! through a predicate; everything else is returned on first failure.
//!
//! ```rust,ignore
//! let policy = RetryPolicy::default();
//! let bytes = policy
//!     .run("load template", |e: &LoadError| e.is_transient(), || read_template(&path))
//!     .await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Factor applied to the delay after every failed attempt.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Bounded retry policy with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Sleep before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// A policy that runs the operation exactly once.
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    /// Delay slept after the given 1-based failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.base_delay.mul_f64(self.multiplier.max(0.0).powi(exponent))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is exhausted. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        operation: &'static str,
        is_retryable: P,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_retryable(&err) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    metrics::counter!("retry_attempts_total", "operation" => operation)
                        .increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
        assert_eq!(policy.multiplier, 1.5);
    }

    #[test]
    fn delays_grow_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2250));
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = RetryPolicy::default()
            .run("test", transient, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_with_backoff() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<u32, TestError> = RetryPolicy::default()
            .run("test", transient, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(TestError::Transient) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms after the first failure, 1500ms after the second.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2500), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2600), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = RetryPolicy::default()
            .run("test", transient, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = RetryPolicy::default()
            .run("test", transient, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Permanent)
            })
            .await;

        assert_eq!(result, Err(TestError::Permanent));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_runs_exactly_once() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = RetryPolicy::none()
            .run("test", transient, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::ZERO, 2.0);
        let _ = policy
            .run("test", transient, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError::Transient)
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
