use std::time::Duration;

/// Status checks allowed per polling session.
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// Fixed delay before each status check.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Attempt counter plus the fixed interval between attempts.
///
/// A fresh budget belongs to each polling session; the count only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    attempts: u32,
    max_attempts: u32,
    interval: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(MAX_POLL_ATTEMPTS, POLL_INTERVAL)
    }
}

impl RetryBudget {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            interval,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Count one status check and return the new total.
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Worst-case time spent waiting between checks.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}
