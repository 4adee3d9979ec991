//! Retry loop: run an async attempt until success or policy says stop.

use std::future::Future;

use crate::transfer::TransferError;

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `attempt_fn` (given the 1-based attempt number) until it succeeds or
/// the policy says to stop. `on_failure` sees every failed attempt together
/// with the decision taken for it, before any backoff sleep.
pub async fn run_with_retry<T, F, Fut, W>(
    policy: &RetryPolicy,
    mut attempt_fn: F,
    mut on_failure: W,
) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
    W: FnMut(u32, &TransferError, RetryDecision),
{
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let decision = policy.decide(attempt, classify::classify(&e));
                on_failure(attempt, &e, decision);
                match decision {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        if !d.is_zero() {
                            tokio::time::sleep(d).await;
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
