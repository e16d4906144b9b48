//! Bounded exponential backoff for idempotent embedding calls.

use sage_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Attempts per request, the first one included
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles after each failure
pub const INITIAL_BACKOFF_MS: u64 = 100;

/// Run `op` until it succeeds, fails with a non-backend error, or runs out
/// of attempts.
///
/// Only `Backend` errors are retried. Configuration and input errors (a
/// rejected credential, an empty text) fail immediately.
pub async fn with_backoff<T, F, Fut>(what: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(AppError::Backend(message)) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(AppError::Backend(message));
                }

                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    what, attempt, MAX_ATTEMPTS, backoff_ms, message
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
