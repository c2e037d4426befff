use std::fmt::Display;
use std::time::Duration;

/// Bounded retry with exponential backoff.
///
/// After failed attempt `n` (0-based) the policy waits `base_delay * 2^n`
/// before the next attempt; no wait follows the last attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` tries with no waiting in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
    /// or the attempt budget is spent. The last error is returned.
    pub fn run<T, E, F, R>(&self, label: &str, mut op: F, is_retryable: R) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
        R: Fn(&E) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let last = attempt + 1 >= attempts;
                    tracing::warn!(
                        call = label,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %err,
                        "attempt failed"
                    );
                    if last || !is_retryable(&err) {
                        return Err(err);
                    }
                    let wait = self.delay_for_attempt(attempt);
                    if !wait.is_zero() {
                        tracing::info!(call = label, wait_ms = wait.as_millis() as u64, "retrying");
                        std::thread::sleep(wait);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
