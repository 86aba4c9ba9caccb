//! Timeout and retry configuration for external calls.

use std::time::Duration;

/// Bounds on external calls and compensation retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts for the compensating release before giving up.
    pub max_attempts: u32,
    /// Base delay between retries; doubles each attempt.
    pub base_delay: Duration,
    /// Timeout applied to each individual external call.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay before the given retry attempt
    /// (1-based): `base_delay * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.base_delay < policy.call_timeout);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(10),
            call_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(3), Duration::from_millis(40));
    }
}
