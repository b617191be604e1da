//! When to re-attempt a compensation, and whether to keep trying.

use std::time::Duration;

/// What the consumer does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Publish a fresh message for another attempt.
    Retry,
    /// Stop retrying this target.
    GiveUp,
}

/// Policy consulted by the retry consumer.
///
/// `attempt` is 0 for the message the request path enqueued and grows by one
/// with every re-publish.
pub trait BackoffPolicy: Send + Sync {
    /// Minimum time between a message being enqueued and it being acted on.
    fn dwell(&self, attempt: u32) -> Duration;

    /// Decides what to do after `attempt` failed.
    fn on_failure(&self, attempt: u32) -> RetryDecision;
}

/// Fixed dwell, unbounded attempts.
#[derive(Debug, Clone, Copy)]
pub struct FixedDwell {
    pub dwell: Duration,
}

impl FixedDwell {
    pub const DEFAULT_DWELL: Duration = Duration::from_secs(10);

    pub fn new(dwell: Duration) -> Self {
        Self { dwell }
    }
}

impl Default for FixedDwell {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DWELL)
    }
}

impl BackoffPolicy for FixedDwell {
    fn dwell(&self, _attempt: u32) -> Duration {
        self.dwell
    }

    fn on_failure(&self, _attempt: u32) -> RetryDecision {
        RetryDecision::Retry
    }
}

/// Exponential dwell capped at `max_dwell`, giving up after `max_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct CappedExponential {
    pub base_dwell: Duration,
    pub max_dwell: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy for CappedExponential {
    fn dwell(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_dwell.saturating_mul(factor).min(self.max_dwell)
    }

    fn on_failure(&self, attempt: u32) -> RetryDecision {
        if attempt.saturating_add(1) >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_dwell_never_gives_up() {
        let policy = FixedDwell::default();
        assert_eq!(policy.dwell(0), Duration::from_secs(10));
        assert_eq!(policy.dwell(1000), Duration::from_secs(10));
        assert_eq!(policy.on_failure(u32::MAX), RetryDecision::Retry);
    }

    #[test]
    fn test_capped_exponential_growth() {
        let policy = CappedExponential {
            base_dwell: Duration::from_secs(10),
            max_dwell: Duration::from_secs(60),
            max_attempts: 5,
        };
        assert_eq!(policy.dwell(0), Duration::from_secs(10));
        assert_eq!(policy.dwell(1), Duration::from_secs(20));
        assert_eq!(policy.dwell(2), Duration::from_secs(40));
        assert_eq!(policy.dwell(3), Duration::from_secs(60));
        assert_eq!(policy.dwell(40), Duration::from_secs(60));
    }

    #[test]
    fn test_capped_exponential_gives_up() {
        let policy = CappedExponential {
            base_dwell: Duration::from_secs(1),
            max_dwell: Duration::from_secs(8),
            max_attempts: 3,
        };
        assert_eq!(policy.on_failure(0), RetryDecision::Retry);
        assert_eq!(policy.on_failure(1), RetryDecision::Retry);
        assert_eq!(policy.on_failure(2), RetryDecision::GiveUp);
    }
}
