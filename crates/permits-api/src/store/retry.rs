//! Retry with exponential backoff for store calls.
//!
//! Only [`StoreError::Transient`] failures are retried. Everything else,
//! including version conflicts, is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use super::StoreError;

/// Retries after the initial attempt.
const MAX_RETRIES: u32 = 3;

/// Doubles each attempt: 100ms, 200ms, 400ms.
const BASE_DELAY_MS: u64 = 100;

pub(crate) async fn with_retry<T, F, Fut>(op: &'static str, f: F) -> Result<T, StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Err(e) if e.is_transient() => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    op,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "store call failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
    f().await
}
