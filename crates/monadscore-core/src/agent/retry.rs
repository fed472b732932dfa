use std::time::Duration;

/// Upper bound for a single exponential backoff wait.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Default attempts per retried call.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default constant delay between keep-alive attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10_000;

/// Default base for the start call's exponential backoff.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Attempt budget and delays shared by the agent's retry loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    /// Base of the exponential backoff used by the start call.
    pub backoff_base: Duration,
    /// Constant delay used by the keep-alive call.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Wait before attempt `attempt` (zero-based): `min(2^attempt * base, 30s)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.backoff_base.as_millis().min(u128::from(MAX_BACKOFF_MS)) as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
    }

    /// Whether another attempt may follow attempt `attempt` (zero-based).
    pub fn has_attempt_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_retries.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            backoff_base: Duration::from_millis(1000),
            ..Default::default()
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(16000));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(30000));
        assert_eq!(policy.backoff_delay(63), Duration::from_millis(30000));
        assert_eq!(policy.backoff_delay(200), Duration::from_millis(30000));
    }

    #[test]
    fn test_backoff_matches_formula() {
        let policy = RetryPolicy {
            backoff_base: Duration::from_millis(700),
            ..Default::default()
        };
        for k in 0..10u32 {
            let expected = (2u64.pow(k) * 700).min(MAX_BACKOFF_MS);
            assert_eq!(policy.backoff_delay(k), Duration::from_millis(expected));
        }
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.has_attempt_after(0));
        assert!(policy.has_attempt_after(1));
        assert!(!policy.has_attempt_after(2));

        let single = RetryPolicy { max_retries: 0, ..Default::default() };
        assert!(!single.has_attempt_after(0));
    }
}
