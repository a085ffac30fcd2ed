// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry around individual store and transport calls.
//!
//! A [`RetryPolicy`] wraps one operation at a time, never a whole job.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::DealmailError;

/// Decides whether an error is worth another attempt.
pub type RetryPredicate = fn(&DealmailError) -> bool;

/// Maximum attempts, linear backoff, and a retryable-error predicate.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    /// Retry transient errors up to `max_attempts` total attempts.
    ///
    /// The n-th retry waits `n * backoff`.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: DealmailError::is_transient,
        }
    }

    /// A policy that runs each operation exactly once.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Replace the retryable-error predicate.
    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, retrying while it fails with a retryable error and attempts remain.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, DealmailError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DealmailError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && (self.retryable)(&err) => {
                    let delay = self.backoff * attempt;
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable failure, trying again"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
