//! Retry with exponential back-off and jitter for pipeline steps.
//!
//! [`retry_with_backoff`] wraps any fallible async operation. The caller
//! supplies the retriability predicate, so the same helper serves engine
//! calls ([`aivis_core::ExternalError::is_retriable`]) and store writes.

use std::future::Future;
use std::time::Duration;

/// Runs `operation` with up to `max_retries` additional attempts on errors
/// the predicate accepts.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt        |
/// |---------|----------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter     |
/// | 3       | 1 000 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 60 s. Non-retriable errors are returned immediately.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    max_retries: u32,
    backoff_base_ms: u64,
    is_retriable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(backoff_base_ms, attempt, rand::random::<f64>());
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

const MAX_DELAY_MS: u64 = 60_000;

/// Jittered delay before attempt `attempt + 1`. `jitter` is a uniform draw
/// from `[0, 1)`; the cap applies to the jittered value, so no sleep ever
/// exceeds [`MAX_DELAY_MS`].
fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32, jitter: f64) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (computed as f64 * (jitter * 0.5 + 0.75)) as u64;
    jittered.min(MAX_DELAY_MS)
}
