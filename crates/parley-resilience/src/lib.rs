// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policies and backoff helpers shared by the reply generator and the
//! delivery dispatcher.
//!
//! Both outbound callers follow the same shape: a bounded attempt loop,
//! a transient-status classifier, and exponentially growing delays with
//! random jitter so synchronized clients spread out.

use std::time::Duration;

use rand::Rng;

/// Bounded retry schedule with exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// The un-jittered delay before `attempt` (1-based; attempt 0 is the
    /// initial try and has no delay).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        // Shift capped so large attempt numbers cannot overflow.
        let exponent = (attempt - 1).min(16);
        self.base_delay * 2u32.pow(exponent)
    }

    /// Jittered delay before `attempt`: the exponential delay scaled by a
    /// random factor in [0.5, 1.5).
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        jitter(self.delay_for(attempt))
    }
}

/// Scale a delay by a random factor in [0.5, 1.5).
pub fn jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.5..1.5);
    delay.mul_f64(factor)
}

/// Whether an HTTP status is worth retrying.
///
/// 429 and the overload statuses are transient; everything else in 4xx is a
/// caller bug and fails fast.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn large_attempt_numbers_do_not_overflow() {
        let policy = RetryPolicy::new(100, Duration::from_millis(500));
        let capped = policy.delay_for(50);
        assert_eq!(capped, policy.delay_for(17));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let d = jitter(base);
            assert!(d >= Duration::from_millis(500));
            assert!(d < Duration::from_millis(1500));
        }
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn transient_classification() {
        assert!(is_transient_status(429));
        assert!(is_transient_status(503));
        assert!(is_transient_status(529));
        assert!(!is_transient_status(400));
        assert!(!is_transient_status(401));
        assert!(!is_transient_status(200));
    }
}
