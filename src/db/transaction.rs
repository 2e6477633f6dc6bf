/*!
 * Retry helper for optimistic units of work.
 *
 * A unit of work opens its own transaction, so re-running it after a version
 * conflict or a document-number collision starts from fresh reads.
 */

use crate::errors::ServiceError;
use metrics::counter;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const BASE_BACKOFF_MS: u64 = 5;

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_retries` extra attempts have been spent. The last retryable error is
/// returned once retries are exhausted.
///
/// ```rust,ignore
/// let req = &request;
/// retry_on_conflict("submit_daily_report", 3, move || self.try_submit(req)).await?;
/// ```
pub async fn retry_on_conflict<T, F, Fut>(
    operation: &'static str,
    max_retries: u32,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut retries = 0u32;
    loop {
        match attempt().await {
            Err(err) if err.is_retryable() && retries < max_retries => {
                retries += 1;
                counter!("harvest_api.unit_of_work.retries", 1, "operation" => operation);
                warn!(operation, retries, error = %err, "Retrying unit of work after conflict");
                tokio::time::sleep(Duration::from_millis(BASE_BACKOFF_MS * retries as u64)).await;
            }
            Err(err) => {
                if err.is_retryable() {
                    counter!("harvest_api.unit_of_work.retries_exhausted", 1, "operation" => operation);
                }
                return Err(err);
            }
            Ok(value) => return Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let calls = &AtomicU32::new(0);
        let result = retry_on_conflict("test", 3, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ServiceError::ConcurrentModification(Uuid::nil()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict("test", 2, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::DuplicateCode("gate_pass_no".into()))
        })
        .await;

        assert_matches!(result, Err(ServiceError::DuplicateCode(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn business_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict("test", 5, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::business("HARVEST_CAPACITY_EXCEEDED", "full"))
        })
        .await;

        assert_matches!(result, Err(ServiceError::BusinessRule { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
