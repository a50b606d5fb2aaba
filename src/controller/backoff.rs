//! # Fibonacci Backoff
//!
//! Retry delays for resources whose reconciliation keeps failing.
//!
//! The sequence is computed in whole minutes and capped: with the defaults it
//! runs 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...
//!
//! ```rust
//! use cloud_config_operator::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! ```

use crate::constants::{DEFAULT_BACKOFF_MAX_MINUTES, DEFAULT_BACKOFF_MIN_MINUTES};
use std::time::Duration;

/// Fibonacci backoff calculator, one per failing resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    max_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_MIN_MINUTES, DEFAULT_BACKOFF_MAX_MINUTES)
    }
}

impl FibonacciBackoff {
    /// Sequence starting at `min_minutes` and never exceeding `max_minutes`
    ///
    /// A zero minimum is raised to one minute and a maximum below the minimum
    /// is raised to the minimum.
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        let min_minutes = min_minutes.max(1);
        let max_minutes = max_minutes.max(min_minutes);
        Self {
            min_minutes,
            max_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
        }
    }

    /// Current delay in seconds, then advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes.saturating_mul(60);

        let next_minutes = self.prev_minutes.saturating_add(self.current_minutes);
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);

        result_seconds
    }

    /// [`next_backoff_seconds`](Self::next_backoff_seconds) as a `Duration`
    ///
    /// ```
    /// use cloud_config_operator::controller::backoff::FibonacciBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = FibonacciBackoff::new(2, 60);
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(120));
    /// ```
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Restart the sequence after a successful reconciliation
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        let seconds: Vec<u64> = (0..9).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(seconds, vec![60, 60, 120, 180, 300, 480, 600, 600, 600]);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        for _ in 0..4 {
            backoff.next_backoff_seconds();
        }

        backoff.reset();
        assert_eq!(backoff.next_backoff_seconds(), 60);
        assert_eq!(backoff.next_backoff_seconds(), 60);
        assert_eq!(backoff.next_backoff_seconds(), 120);
    }

    #[test]
    fn test_fibonacci_backoff_bounds_are_sanitized() {
        let mut zero_min = FibonacciBackoff::new(0, 10);
        assert_eq!(zero_min.next_backoff(), Duration::from_secs(60));

        let mut inverted = FibonacciBackoff::new(5, 2);
        assert_eq!(inverted.next_backoff_seconds(), 300);
        assert_eq!(inverted.next_backoff_seconds(), 300);
    }

    #[test]
    fn test_fibonacci_backoff_default() {
        assert_eq!(
            FibonacciBackoff::default(),
            FibonacciBackoff::new(DEFAULT_BACKOFF_MIN_MINUTES, DEFAULT_BACKOFF_MAX_MINUTES)
        );
    }

    #[test]
    fn test_fibonacci_backoff_independent_state() {
        let mut first = FibonacciBackoff::new(1, 10);
        let mut second = FibonacciBackoff::new(1, 10);

        for _ in 0..5 {
            first.next_backoff_seconds();
        }
        assert_eq!(second.next_backoff_seconds(), 60);

        first.reset();
        assert_eq!(first.next_backoff_seconds(), 60);
        assert_eq!(second.next_backoff_seconds(), 60);
        assert_eq!(second.next_backoff_seconds(), 120);
    }
}
