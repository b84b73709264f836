//! Exponential back-off retry policy.

use std::time::Duration;

/// Retry policy for model calls in the synthesis phases.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub maximum_attempts: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Multiplier applied per retry.
    pub backoff_coefficient: f64,
    /// Ceiling on any single delay.
    pub maximum_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            initial_interval: Duration::from_secs(5),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given 1-based failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_coefficient.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_interval.mul_f64(factor);
        delay.min(self.maximum_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
        assert_eq!(policy.delay_after(3), Duration::from_secs(20));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            maximum_attempts: 10,
            ..Default::default()
        };
        assert_eq!(policy.delay_after(8), Duration::from_secs(30));
    }
}
