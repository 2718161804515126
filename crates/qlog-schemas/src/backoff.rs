// crates/qlog-schemas/src/backoff.rs
// ============================================================================
// Module: Retry Backoff
// Description: Exponential backoff bounded by a total time budget.
// Purpose: Retry transient transport failures without stalling forever.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! The delay starts at `initial`, doubles after each failed attempt and is
//! capped at `max`. A retry is only scheduled when it would start within
//! `budget` of the first attempt; otherwise the last failure is returned.

use std::fmt::Display;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::warn;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// First retry delay.
    pub initial: Duration,
    /// Delay cap.
    pub max: Duration,
    /// Total time budget measured from the first attempt.
    pub budget: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(5),
            budget: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            initial: Duration::ZERO,
            max: Duration::ZERO,
            budget: Duration::ZERO,
        }
    }

    /// Runs `attempt` until it succeeds, fails permanently or the budget runs out.
    ///
    /// # Errors
    ///
    /// Returns the last error when it is not retryable or the budget is spent.
    pub fn retry<T, E, A, R>(&self, operation: &str, mut attempt: A, retryable: R) -> Result<T, E>
    where
        E: Display,
        A: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
    {
        let started = Instant::now();
        let mut delay = self.initial;
        let mut attempts: u32 = 1;
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) && started.elapsed() + delay < self.budget => {
                    warn!(
                        operation,
                        attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying after transient failure"
                    );
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2).min(self.max);
                    attempts = attempts.saturating_add(1);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
