//! Retry policy for cart transactions.
//!
//! ```text
//! attempt ──► Ok ─────────────────────────────────────────► return
//!    │
//!    └──► Err ── retryable && retries left? ── no ────────► return Err
//!                        │
//!                       yes
//!                        ▼
//!              sleep(backoff.next_backoff()) ──► attempt again
//! ```
//!
//! Only [`CartError::is_retryable`](crate::CartError::is_retryable) failures are retried, and each attempt
//! re-runs the whole transaction from `BEGIN`.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::warn;

use crate::error::CartResult;

/// Retry bounds for cart transactions.
///
/// - Max retries: 3
/// - Min delay: 10ms
/// - Max delay: 200ms
/// - Jitter enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartServiceConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for CartServiceConfig {
    fn default() -> Self {
        CartServiceConfig {
            max_retries: 3,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
        }
    }
}

impl CartServiceConfig {
    /// Sets the retry limit.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the backoff window.
    pub fn delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }

    /// Fresh backoff state for one operation.
    pub fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.min_delay,
            max_interval: self.max_delay,
            multiplier: 2.0,
            max_elapsed_time: None, // bounded by max_retries instead
            ..Default::default()
        };
        // current_interval starts at the crate default (500ms) until reset
        backoff.reset();
        backoff
    }

    /// Next sleep, with jitter kept inside `[min_delay, max_delay]`.
    pub fn next_delay(&self, backoff: &mut ExponentialBackoff) -> Option<Duration> {
        backoff
            .next_backoff()
            .map(|delay| delay.max(self.min_delay).min(self.max_delay))
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or the retry
/// budget is spent.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &CartServiceConfig,
    op: &'static str,
    mut attempt: F,
) -> CartResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CartResult<T>>,
{
    let mut backoff = config.backoff();
    let mut retry_count = 0usize;

    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || retry_count >= config.max_retries {
            return Err(err);
        }
        retry_count += 1;

        let Some(delay) = config.next_delay(&mut backoff) else {
            return Err(err);
        };

        warn!(
            op,
            attempt = retry_count,
            delay = ?delay,
            error = %err,
            "Storage busy, retrying transaction"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CartError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast() -> CartServiceConfig {
        CartServiceConfig::default().delays(Duration::from_millis(1), Duration::from_millis(2))
    }

    fn busy() -> CartError {
        CartError::StorageUnavailable {
            reason: "database is locked".into(),
            transient: true,
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let attempts = AtomicUsize::new(0);

        let result = with_retry(&fast(), "test", || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(busy())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let attempts = AtomicUsize::new(0);

        let result: CartResult<()> = with_retry(&fast().max_retries(2), "test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(busy())
        })
        .await;

        assert!(matches!(result, Err(CartError::StorageUnavailable { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);

        let result: CartResult<()> = with_retry(&fast(), "test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(CartError::not_found("Variant", "v-1"))
        })
        .await;

        assert!(matches!(result, Err(CartError::NotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_delay_starts_at_min_delay() {
        let config = CartServiceConfig::default();

        for _ in 0..20 {
            let mut backoff = config.backoff();
            let first = config.next_delay(&mut backoff).unwrap();
            // randomization_factor 0.5 around initial_interval
            assert!(first <= config.min_delay.mul_f64(1.5), "first delay {first:?}");
            assert!(first >= config.min_delay);
        }
    }

    #[test]
    fn test_backoff_respects_window() {
        let config = CartServiceConfig::default();
        let mut backoff = config.backoff();

        for _ in 0..20 {
            let delay = config.next_delay(&mut backoff).unwrap();
            assert!(delay >= config.min_delay, "delay {delay:?}");
            assert!(delay <= config.max_delay, "delay {delay:?}");
        }
    }
}
