//! Reconnect delay schedule.

use std::time::Duration;

/// Exponential backoff capped at a ceiling: `min(base * 2^n, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.min(max);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.checked_mul(2).unwrap_or(self.max);
        self.current = std::cmp::min(next, self.max);
        delay
    }

    /// Start over from `base`, after a successful authentication.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}
