//! Centralized retry policy.

use std::time::Duration;

/// Exponential backoff with a delay ceiling and an attempt ceiling.
///
/// One policy instance drives the queue drain loop; the numeric constants
/// are configuration, not a contract. What is a contract: retries never
/// busy-loop, the delay never exceeds `max_delay`, and after `max_attempts`
/// failed attempts an action becomes terminal instead of retrying forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts before an action is declared terminally failed.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Growth factor applied per subsequent failure.
    pub multiplier: f64,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before the attempt that follows `failed_attempts`
    /// failures (1 failure yields the base delay).
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let factor = self.multiplier.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let delay = self.base_delay.mul_f64(factor.max(0.0));
        delay.min(self.max_delay)
    }

    /// Whether an action with this many failed attempts is out of retries.
    #[must_use]
    pub const fn is_exhausted(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped_at_the_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(30), Duration::from_secs(30));
    }

    #[test]
    fn exhaustion_matches_attempt_ceiling() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }
}
