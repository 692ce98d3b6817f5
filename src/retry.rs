//! Bounded retry loop for the prepare transition.
//!
//! A tank that is still tearing down a previous stage may refuse the prepare
//! request for a short while, so the call is repeated until it lands or the
//! policy is exhausted. There is deliberately no delay between attempts;
//! callers that want pacing must add it themselves.
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub window: Duration,
    pub attempt_limit: u32,
}

impl RetryPolicy {
    /// Repeats `call` until it succeeds, fails with a non-retryable error,
    /// or the attempt count / elapsed time bound is hit.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `call`, unchanged.
    pub async fn run<T, F, Fut>(self, mut call: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    attempts = attempts.saturating_add(1);
                    if start.elapsed() >= self.window || attempts >= self.attempt_limit {
                        return Err(err);
                    }
                    warn!("prepare attempt {} failed, retrying: {}", attempts, err);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
