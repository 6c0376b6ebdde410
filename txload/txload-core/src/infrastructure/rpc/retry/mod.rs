use crate::domain::RetryPolicy;
use crate::foundation::{LoadError, Result};
use std::future::Future;
use tokio::time::sleep;

/// Retries `op` under `policy` while `should_retry` accepts the error.
///
/// The closure gets the zero-based attempt index. The last error is returned once the budget is
/// spent or a non-retryable error comes back.
pub async fn retry_if<F, Fut, T, P>(policy: RetryPolicy, mut should_retry: P, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&LoadError) -> bool,
{
    let mut last_err = None;
    for attempt in 0..policy.max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(&err) => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| LoadError::Message("retry budget is zero".to_string())))
}

/// [`retry_if`] retrying every error.
pub async fn retry<F, Fut, T>(policy: RetryPolicy, op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_if(policy, |_| true, op).await
}
