//! Retry engine with exponential backoff.
//!
//! Every network-facing operation in the core (catalog resolution, favorite
//! toggling) runs through [`RetryExecutor::execute`]. The executor classifies
//! raw failures, short-circuits on non-retryable ones, and otherwise sleeps
//! through a capped exponential backoff with symmetric jitter before trying
//! again.
//!
//! Known limitation, kept deliberately: there is no wall-clock deadline across
//! attempts. The only bounds are the attempt budget and the per-attempt delay
//! cap, so a slow-but-succeeding operation is allowed to eventually succeed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use tokio::time::Instant;

use crate::analytics::ErrorAnalytics;
use crate::error::{classify, ClassifiedError, PlayerError};

pub type RetryPredicate = Arc<dyn Fn(&ClassifiedError) -> bool + Send + Sync>;

/// Configuration for one family of retried operations. Construct once, share
/// across invocations.
///
/// `max_delay` caps the exponential schedule only. The executor floors the
/// computed delay at the classifier's suggested backoff, so a rate-limited
/// failure waits its full suggested pause even under a policy with a
/// smaller cap.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter_fraction: f64,
    pub should_retry: RetryPredicate,
}

impl RetryPolicy {
    /// Background network calls: a few attempts, patient backoff.
    pub fn network() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.25,
            should_retry: Arc::new(|err| err.retryable),
        }
    }

    /// User-initiated actions: more attempts with a smaller base delay so the
    /// action feels responsive but survives transient blips.
    pub fn critical() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_fraction: 0.25,
            should_retry: Arc::new(|err| err.retryable),
        }
    }

    /// Cheap best-effort calls that should fail fast.
    pub fn quick() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter_fraction: 0.1,
            should_retry: Arc::new(|err| err.retryable),
        }
    }

    /// Backoff before the next attempt, given that attempt number `attempt`
    /// (1-based) just failed: `min(base * multiplier^(attempt-1), max)`.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// Source of backoff jitter. Injectable so tests run deterministically.
pub trait Jitter: Send + Sync {
    /// Apply symmetric jitter of `±delay * fraction` to `delay`, clamped to ≥ 0.
    fn apply(&self, delay: Duration, fraction: f64) -> Duration;
}

/// Default jitter source backed by the thread-local RNG.
pub struct ThreadRngJitter;

impl Jitter for ThreadRngJitter {
    fn apply(&self, delay: Duration, fraction: f64) -> Duration {
        if fraction <= 0.0 || delay.is_zero() {
            return delay;
        }
        let span = delay.as_secs_f64() * fraction;
        let offset = rand::rng().random_range(-span..=span);
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
    }
}

/// Deterministic jitter source: leaves delays untouched. Used in tests.
pub struct NoJitter;

impl Jitter for NoJitter {
    fn apply(&self, delay: Duration, _fraction: f64) -> Duration {
        delay
    }
}

/// Shared retry engine. Constructed once by the composition root and handed to
/// the resolver and the favorite service.
#[derive(Clone)]
pub struct RetryExecutor {
    analytics: ErrorAnalytics,
    jitter: Arc<dyn Jitter>,
}

impl RetryExecutor {
    pub fn new(analytics: ErrorAnalytics) -> Self {
        Self::with_jitter(analytics, Arc::new(ThreadRngJitter))
    }

    pub fn with_jitter(analytics: ErrorAnalytics, jitter: Arc<dyn Jitter>) -> Self {
        Self { analytics, jitter }
    }

    /// Run `operation` under `policy`.
    ///
    /// Non-retryable failures propagate on first occurrence; retryable ones
    /// are retried until the attempt budget runs out. Either way the final
    /// error carries the original [`PlayerError`], and terminal failures are
    /// recorded into analytics under `label`.
    pub async fn execute<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        label: &str,
        mut operation: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PlayerError>>,
    {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            operation = label,
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "operation succeeded after retry"
                        );
                        self.analytics.record_recovery(label).await;
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let classified = classify(err);

                    if !(policy.should_retry)(&classified) {
                        tracing::warn!(
                            operation = label,
                            error_type = %classified.error_type(),
                            error = %classified.source_error(),
                            "non-retryable error, giving up"
                        );
                        self.analytics.record_error(&classified, label).await;
                        return Err(classified);
                    }

                    if attempt >= policy.max_attempts {
                        tracing::error!(
                            operation = label,
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            error = %classified.source_error(),
                            "retry budget exhausted"
                        );
                        self.analytics.record_error(&classified, label).await;
                        return Err(classified);
                    }

                    // Honor the classifier's suggested backoff when it is longer
                    // than the policy's (rate limits ask for a longer pause).
                    let delay = policy
                        .delay_after_attempt(attempt)
                        .max(classified.suggested_backoff);
                    let delay = self.jitter.apply(delay, policy.jitter_fraction);

                    tracing::debug!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %classified.source_error(),
                        "will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn executor() -> RetryExecutor {
        RetryExecutor::with_jitter(ErrorAnalytics::default(), Arc::new(NoJitter))
    }

    fn flaky_network_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.0,
            should_retry: Arc::new(|err| err.retryable),
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = flaky_network_policy(10);
        assert_eq!(policy.delay_after_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after_attempt(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after_attempt(5), Duration::from_secs(10));
        assert_eq!(policy.delay_after_attempt(9), Duration::from_secs(10));
    }

    #[test]
    fn jitter_is_clamped_to_non_negative() {
        let jittered = ThreadRngJitter.apply(Duration::from_millis(10), 1.0);
        assert!(jittered <= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn succeeds_first_attempt_without_delay() {
        let result = executor()
            .execute(&flaky_network_policy(3), "test_op", || async {
                Ok::<_, PlayerError>(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_with_expected_elapsed_time() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result = executor()
            .execute(&flaky_network_policy(3), "test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(PlayerError::RequestTimeout) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s after attempt 1, 2s after attempt 2, then the final failure.
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(matches!(err.source_error(), PlayerError::RequestTimeout));
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let attempts = AtomicU32::new(0);

        let result = executor()
            .execute(&flaky_network_policy(5), "test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(PlayerError::PermissionDenied("library".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);

        let result = executor()
            .execute(&flaky_network_policy(5), "test_op", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PlayerError::ConnectionFailed("refused".into()))
                    } else {
                        Ok("resolved")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "resolved");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_backoff_overrides_shorter_policy_delay() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let _ = executor()
            .execute(&flaky_network_policy(2), "test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(PlayerError::RateLimited) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        // Policy would wait 1s; the rate-limit classification asks for 10s.
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_backoff_exceeds_a_smaller_policy_cap() {
        let started = Instant::now();
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_fraction: 0.0,
            should_retry: Arc::new(|err| err.retryable),
        };

        let _ = executor()
            .execute(&policy, "test_op", || async {
                Err::<(), _>(PlayerError::RateLimited)
            })
            .await;

        // The 5s cap bounds the exponential schedule, not the classifier's
        // 10s rate-limit pause.
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failures_are_recorded_in_analytics() {
        let analytics = ErrorAnalytics::default();
        let executor = RetryExecutor::with_jitter(analytics.clone(), Arc::new(NoJitter));

        let _ = executor
            .execute(&flaky_network_policy(2), "catalog_search", || async {
                Err::<(), _>(PlayerError::RequestTimeout)
            })
            .await;

        let summary = analytics.summary().await;
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.by_type["network.request_timeout"], 1);
    }
}
