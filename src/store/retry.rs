use std::future::Future;
use std::time::Duration;

use crate::config::RetryPolicy;
use crate::error::StorageError;

/// Runs `attempt` until it succeeds, fails permanently, or the policy's
/// attempts are used up. Only transient errors are retried.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut retries = 0;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && retries + 1 < policy.max_attempts => {
                retries += 1;
                let delay = policy.delay_for_attempt(retries);
                tracing::warn!(
                    attempt = retries,
                    delay_ms = delay,
                    error = %e,
                    "Transient storage failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 1,
        }
    }

    fn busy() -> StorageError {
        StorageError::Database(sqlx::Error::PoolTimedOut)
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_policy(3), || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(busy())
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StorageError::Database(sqlx::Error::RowNotFound)) }
        })
        .await;

        assert!(matches!(
            result,
            Err(StorageError::Database(sqlx::Error::RowNotFound))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StorageError::Conflict {
                    expected: 0,
                    found: 1,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(4), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(busy()) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(busy()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
