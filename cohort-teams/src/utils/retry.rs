// cohort-teams/src/utils/retry.rs
//! Bounded retry with exponential backoff for operations that lost a race on
//! a team (lease timeout or version mismatch).

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::models::ServiceError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    // Delay before retry number `step` (0 = first retry)
    pub fn backoff(&self, step: u32) -> Duration {
        let factor = 2u32.saturating_pow(step);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out. The last retryable error is returned as-is.
    pub fn run<T, F>(&self, op_name: &str, mut op: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Result<T, ServiceError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.backoff(attempt - 1);
                    debug!(
                        "🔁 {} attempt {}/{} lost a race ({}), retrying in {:?}",
                        op_name, attempt, attempts, err, delay
                    );
                    thread::sleep(delay);
                }
                Err(err) if err.is_retryable() => {
                    warn!("⚠️ {} gave up after {} attempts: {}", op_name, attempts, err);
                    return Err(err);
                }
                result => return result,
            }
        }
    }
}
