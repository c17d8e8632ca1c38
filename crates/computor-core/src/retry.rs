//! Retry policy shared by every activity the Durable Workflow Engine
//! adapter executes. The defaults mirror the design's §5 defaults
//! exactly; callers override per-activity when a step's nature calls
//! for a different envelope (e.g. a short-lived DB lookup vs. a
//! multi-minute archive download).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `(initial_interval, coefficient, max_interval, max_attempts)` as an
/// exponential backoff schedule. `non_retryable` kinds (see
/// [`crate::ErrorKind`]) ignore this policy entirely and surface on
/// the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(with = "duration_millis")]
    pub initial_interval: Duration,
    pub coefficient: f64,
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            coefficient: 2.0,
            max_interval: Duration::from_secs(5 * 60),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Backoff interval before the `attempt`-th retry (1-indexed: the
    /// interval before the *first* retry, after the initial attempt,
    /// is `backoff_for(1)`).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial_interval.as_secs_f64() * self.coefficient.powi(attempt as i32 - 1);
        Duration::from_secs_f64(scaled.min(self.max_interval.as_secs_f64()))
    }

    pub fn exhausted(&self, attempts_made: u32) -> bool {
        attempts_made >= self.max_attempts
    }

    /// Fast DB activities: short timeout budget and the default backoff.
    pub fn fast_db() -> Self {
        Self::default()
    }

    /// Provider (Git host) API calls.
    pub fn provider_call() -> Self {
        Self {
            max_attempts: 5,
            ..Self::default()
        }
    }

    /// Repository clone/push — fewer, wider-spaced retries since each
    /// attempt is expensive.
    pub fn repository_transfer() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            coefficient: 2.0,
            max_interval: Duration::from_secs(5 * 60),
            max_attempts: 3,
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert!(policy.backoff_for(20) <= policy.max_interval);
    }

    #[test]
    fn exhaustion() {
        let policy = RetryPolicy::default();
        assert!(!policy.exhausted(4));
        assert!(policy.exhausted(5));
    }
}
