use std::future::Future;
use std::time::Duration;
use tracing::warn;
use crate::config::{BackoffKind, Config};
use crate::helpers::errors::PlacesError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
    pub backoff: BackoffKind,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            backoff: BackoffKind::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
            backoff: config.retry_backoff,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.delay,
            BackoffKind::Exponential => {
                let exponent = attempt.saturating_sub(1).min(16) as u32;
                self.delay.saturating_mul(2u32.pow(exponent))
            }
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or
/// `policy.max_attempts` is reached.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed on attempt {}/{} due to: {}, retrying in {:?}",
                    label, attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("{} failed after {} attempt(s) due to: {}", label, attempt, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use super::*;

    fn policy(backoff: BackoffKind) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            backoff,
        }
    }

    #[test]
    fn fixed_delay_stays_constant() {
        let policy = policy(BackoffKind::Fixed);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(500));
    }

    #[test]
    fn exponential_delay_doubles() {
        let policy = policy(BackoffKind::Exponential);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = retry(&policy(BackoffKind::Fixed), "lookup", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(PlacesError::Network("timeout".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry(&policy(BackoffKind::Exponential), "lookup", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PlacesError::Status(502)) }
        })
        .await;

        assert_eq!(result, Err(PlacesError::Status(502)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry(&policy(BackoffKind::Fixed), "lookup", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PlacesError::NotFound("place".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
