//! Backoff policy for session-expiration retries
//!
//! A [`DelayRetryPolicy`] is a pure function of the retry index: index 0 is
//! the first retry after the initial attempt failed. It never keeps state;
//! callers track their own retry count.

use std::time::Duration;

use arbor_common::Configuration;

/// How many retries a policy permits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    Bounded(u32),
    Unbounded,
}

/// Outcome of consulting the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the duration, then retry
    Retry(Duration),
    /// No retries left
    Exhausted,
}

/// Retry budget plus a capped exponential delay schedule
///
/// `delay(n) = min(base_delay * multiplier^n, max_delay)`; a multiplier of
/// `1.0` gives a constant schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayRetryPolicy {
    budget: RetryBudget,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl DelayRetryPolicy {
    pub fn new(
        budget: RetryBudget,
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            budget,
            base_delay,
            multiplier,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// `max_retries` retries, all waiting `delay`
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::new(RetryBudget::Bounded(max_retries), delay, 1.0, delay)
    }

    pub fn exponential(
        max_retries: u32,
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self::new(
            RetryBudget::Bounded(max_retries),
            base_delay,
            multiplier,
            max_delay,
        )
    }

    /// Retry forever; for data whose loss is worse than its delay
    pub fn unbounded(base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self::new(RetryBudget::Unbounded, base_delay, multiplier, max_delay)
    }

    /// One attempt, no retries
    pub fn no_retry() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    pub fn from_configuration(config: &Configuration) -> Self {
        let budget = match config.max_retries() {
            Some(n) => RetryBudget::Bounded(n),
            None => RetryBudget::Unbounded,
        };
        Self::new(
            budget,
            Duration::from_millis(config.base_delay_ms()),
            config.multiplier(),
            Duration::from_millis(config.max_delay_ms()),
        )
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    pub fn max_retries(&self) -> Option<u32> {
        match self.budget {
            RetryBudget::Bounded(n) => Some(n),
            RetryBudget::Unbounded => None,
        }
    }

    /// Delay scheduled for retry `index`, ignoring the budget
    pub fn delay(&self, index: u32) -> Duration {
        let base = self.base_delay.as_nanos() as f64;
        let scaled = base * self.multiplier.powi(index.min(i32::MAX as u32) as i32);
        let cap = self.max_delay.as_nanos() as f64;
        if !scaled.is_finite() || scaled >= cap {
            self.max_delay
        } else {
            Duration::from_nanos(scaled as u64)
        }
    }

    /// Decide what to do after a failure, given how many retries already ran
    pub fn decide(&self, retries: u32) -> RetryDecision {
        match self.budget {
            RetryBudget::Bounded(max) if retries >= max => RetryDecision::Exhausted,
            _ => RetryDecision::Retry(self.delay(retries)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_policy() {
        let policy = DelayRetryPolicy::fixed(2, Duration::from_millis(50));
        assert_eq!(policy.max_retries(), Some(2));
        assert_eq!(
            policy.decide(0),
            RetryDecision::Retry(Duration::from_millis(50))
        );
        assert_eq!(
            policy.decide(1),
            RetryDecision::Retry(Duration::from_millis(50))
        );
        assert_eq!(policy.decide(2), RetryDecision::Exhausted);
    }

    #[test]
    fn test_exponential_schedule_is_capped() {
        let policy = DelayRetryPolicy::exponential(
            10,
            Duration::from_millis(10),
            2.0,
            Duration::from_millis(100),
        );
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(1), Duration::from_millis(20));
        assert_eq!(policy.delay(3), Duration::from_millis(80));
        assert_eq!(policy.delay(4), Duration::from_millis(100));
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(100));
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = DelayRetryPolicy::no_retry();
        assert_eq!(policy.decide(0), RetryDecision::Exhausted);
    }

    #[test]
    fn test_unbounded_policy_never_exhausts() {
        let policy = DelayRetryPolicy::unbounded(
            Duration::from_millis(1),
            3.0,
            Duration::from_secs(1),
        );
        assert_eq!(policy.budget(), RetryBudget::Unbounded);
        assert_eq!(
            policy.decide(u32::MAX),
            RetryDecision::Retry(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_invalid_multiplier_falls_back_to_constant() {
        let policy = DelayRetryPolicy::exponential(
            3,
            Duration::from_millis(5),
            0.5,
            Duration::from_millis(1),
        );
        // cap is raised to the base delay
        assert_eq!(policy.delay(2), Duration::from_millis(5));
    }

    #[test]
    fn test_from_configuration() {
        let policy = DelayRetryPolicy::from_configuration(&Configuration::default());
        assert_eq!(policy.max_retries(), Some(3));
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(1), Duration::from_millis(20));
    }

    proptest! {
        #[test]
        fn prop_schedule_is_monotonic(base in 0u64..500, mult in 1.0f64..4.0, cap in 0u64..5000, idx in 0u32..64) {
            let policy = DelayRetryPolicy::unbounded(
                Duration::from_millis(base),
                mult,
                Duration::from_millis(cap),
            );
            prop_assert!(policy.delay(idx) <= policy.delay(idx + 1));
            prop_assert!(policy.delay(idx) <= Duration::from_millis(cap.max(base)));
        }
    }
}
