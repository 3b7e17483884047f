//! Retries for idempotent backend reads.
//!
//! Creating or updating a post is sent exactly once and never comes through
//! here.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::Result;

/// How often and how patiently a read is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRetry {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Pause before the second attempt; doubled for each later one.
    pub first_delay: Duration,
    /// Ceiling for a single pause.
    pub max_delay: Duration,
    /// No retry is started past this much time since the first attempt.
    pub budget: Duration,
}

impl Default for ReadRetry {
    fn default() -> Self {
        Self {
            attempts: 4,
            first_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            budget: Duration::from_secs(30),
        }
    }
}

impl ReadRetry {
    /// No pauses between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            first_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            budget: Duration::MAX,
        }
    }

    /// Pause taken after failed attempt `n` (1-based).
    fn delay_after(&self, n: u32) -> Duration {
        let factor = 1u32.checked_shl(n.saturating_sub(1)).unwrap_or(u32::MAX);
        self.first_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `read` until it succeeds, fails with a non-retriable error, or the
/// policy is exhausted. The last error is returned.
pub async fn retry_read<F, Fut, T>(mut read: F, policy: &ReadRetry) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Instant::now().checked_add(policy.budget);
    let mut attempt = 1;

    loop {
        let err = match read().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let pause = policy.delay_after(attempt);
        let out_of_time = deadline.is_some_and(|d| Instant::now() + pause > d);
        if attempt >= policy.attempts || !err.is_retriable() || out_of_time {
            return Err(err);
        }

        debug!("Read attempt {} failed ({}), retrying in {:?}", attempt, err, pause);
        sleep(pause).await;
        attempt += 1;
    }
}
