// Bounded exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given (1-based) retry, exponential with jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64 / 4);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Run `op`, retrying transient failures up to the policy's attempt budget.
/// Permanent failures return immediately; exhausting the budget escalates
/// the last transient error to a permanent one.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "transient provider failure (attempt {}/{}), retrying in {:?}: {}",
                    attempt,
                    policy.max_attempts,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(ProviderError::Transient(msg)) => {
                return Err(ProviderError::Permanent(format!(
                    "retries exhausted after {} attempts: {}",
                    policy.max_attempts, msg
                )));
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Transient("rate limited".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_transient_becomes_permanent() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Transient("timeout".into())) }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_fails_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Permanent("bad request".into())) }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
