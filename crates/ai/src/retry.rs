//! Attempt budget and backoff between generation attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between attempts
    #[default]
    Fixed,
    /// Exponential backoff: base * 2^(n-1)
    Exponential,
    /// Linear backoff: base * n
    Linear,
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay between attempts
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
    /// Jitter factor (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    /// Three attempts back to back.
    fn default() -> Self {
        Self::fixed(3, Duration::ZERO)
    }
}

impl RetryPolicy {
    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            jitter: 0.0,
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.0,
        }
    }

    /// Spread each delay by up to `jitter` of its value in either direction.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let nominal = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt).min(self.max_delay),
        };
        spread(nominal, self.jitter, attempt)
    }

    /// Whether another attempt is allowed after `attempt` attempts were made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Offset `delay` by a fraction in `[-jitter, +jitter]` picked from `attempt`.
///
/// Deterministic so a given policy always waits the same way.
fn spread(delay: Duration, jitter: f64, attempt: u32) -> Duration {
    if jitter <= 0.0 || delay.is_zero() {
        return delay;
    }
    let unit = f64::from(attempt.wrapping_mul(37) % 101) / 50.0 - 1.0;
    delay.mul_f64((1.0 + jitter.min(1.0) * unit).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_three_attempts_without_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(2), Duration::ZERO);
    }

    #[test]
    fn exponential_backoff_calculates_correctly() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_secs(10));
        assert_eq!(policy.jitter, 0.0);

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy =
            RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(6), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(300));
    }

    #[test]
    fn linear_backoff_increases_linearly() {
        let policy = RetryPolicy {
            strategy: BackoffStrategy::Linear,
            ..RetryPolicy::fixed(5, Duration::from_millis(100))
        };
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..policy
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!RetryPolicy::fixed(1, Duration::ZERO).should_retry(1));
    }

    #[test]
    fn jitter_is_opt_in_and_bounded() {
        let plain = RetryPolicy::fixed(5, Duration::from_secs(1));
        assert_eq!(plain.delay_for_attempt(1), Duration::from_secs(1));

        let jittered = plain.clone().with_jitter(0.5);
        for attempt in 1..=4 {
            let delay = jittered.delay_for_attempt(attempt);
            assert!(delay >= Duration::from_millis(500), "{delay:?}");
            assert!(delay <= Duration::from_millis(1500), "{delay:?}");
            assert_eq!(delay, jittered.delay_for_attempt(attempt));
        }
        assert_ne!(jittered.delay_for_attempt(1), plain.delay_for_attempt(1));
        assert_eq!(plain.with_jitter(7.0).jitter, 1.0);
    }
}
