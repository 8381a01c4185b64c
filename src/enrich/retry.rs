//! Retry policy as a pure decision function.
//!
//! The orchestrators ask `decide` what to do after each failed attempt and
//! perform the sleep themselves, so the policy is unit-testable without any
//! client or clock. Jitter is applied separately to keep `decide`
//! deterministic.

use rand::Rng;
use std::time::Duration;

use super::{BACKOFF_BASE, BACKOFF_MAX, DOSSIER_MAX_RETRIES, URL_MAX_RETRIES};

/// Bounded exponential backoff: `base * 2^(attempt-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts tolerated before giving up; total submissions are
    /// `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Policy for URL batches.
    pub const fn url_default() -> Self {
        Self::new(URL_MAX_RETRIES, BACKOFF_BASE, BACKOFF_MAX)
    }

    /// Policy for dossier rows.
    pub const fn dossier_default() -> Self {
        Self::new(DOSSIER_MAX_RETRIES, BACKOFF_BASE, BACKOFF_MAX)
    }

    /// Decide after `failed_attempts` consecutive failures (1-based).
    pub fn decide(&self, failed_attempts: u32) -> RetryDecision {
        if failed_attempts > self.max_retries {
            return RetryDecision::GiveUp;
        }
        let exponent = failed_attempts.saturating_sub(1).min(20);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        RetryDecision::Retry(delay)
    }
}

/// Spread a backoff delay by ±25% so concurrent callers do not align.
pub fn jittered(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = rand::rng().random_range(0.75..1.25);
    delay.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_the_cap() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(3));
        assert_eq!(
            policy.decide(1),
            RetryDecision::Retry(Duration::from_millis(500))
        );
        assert_eq!(
            policy.decide(2),
            RetryDecision::Retry(Duration::from_millis(1000))
        );
        assert_eq!(
            policy.decide(3),
            RetryDecision::Retry(Duration::from_millis(2000))
        );
        // 4000ms capped at 3000ms.
        assert_eq!(
            policy.decide(4),
            RetryDecision::Retry(Duration::from_secs(3))
        );
    }

    #[test]
    fn gives_up_after_the_budget() {
        let policy = RetryPolicy::url_default();
        assert!(matches!(
            policy.decide(policy.max_retries),
            RetryDecision::Retry(_)
        ));
        assert_eq!(policy.decide(policy.max_retries + 1), RetryDecision::GiveUp);
    }

    #[test]
    fn jitter_stays_near_the_delay() {
        let delay = Duration::from_millis(1000);
        for _ in 0..100 {
            let j = jittered(delay);
            assert!(j >= Duration::from_millis(750));
            assert!(j < Duration::from_millis(1250));
        }
        assert_eq!(jittered(Duration::ZERO), Duration::ZERO);
    }
}
