use std::time::Duration;

use serde::Deserialize;

/// What one attempt of a retried operation produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    Done(T),
    /// The observed state changed mid-operation; try again.
    Raced,
}

/// The operation raced on every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetriesExhausted {
    pub attempts: u32,
}

/// Bounded retry with a doubling backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff_ms: 10,
            max_backoff_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms.max(self.initial_backoff_ms));
        Duration::from_millis(ms)
    }

    /// Runs `op` until it finishes, fails, or has raced `max_attempts` times.
    /// At least one attempt is always made.
    pub fn run<T, E>(
        &self,
        mut op: impl FnMut(u32) -> Result<Attempt<T>, E>,
    ) -> Result<Result<T, RetriesExhausted>, E> {
        let max_attempts = self.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match op(attempt)? {
                Attempt::Done(value) => return Ok(Ok(value)),
                Attempt::Raced if attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Attempt::Raced => {}
            }
        }
        Ok(Err(RetriesExhausted {
            attempts: max_attempts,
        }))
    }
}
