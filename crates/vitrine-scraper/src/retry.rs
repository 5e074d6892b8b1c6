//! Retry utilities for page navigation.
//!
//! Transient failures (rate limiting, connection errors, 5xx responses) are
//! retried with exponential backoff and a small random jitter. Everything else
//! is returned immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::SessionError;

/// Returns `true` if `err` is transient and worth retrying.
///
/// Navigation timeouts are not retried: the caller degrades to whatever the
/// page exposed instead.
fn is_retriable(err: &SessionError) -> bool {
    match err {
        SessionError::RateLimited { .. } => true,
        SessionError::Http(e) => !e.is_timeout(),
        SessionError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)` seconds
/// plus up to 250ms of jitter. With `max_retries = 2` the operation is
/// attempted at most 3 times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        let jitter_ms = if backoff_base_secs == 0 {
            0
        } else {
            rand::rng().random_range(0..=250u64)
        };
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient navigation error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs) + Duration::from_millis(jitter_ms))
            .await;
        attempt += 1;
    }
}
