//! List configuration.

use crate::error::ConfigError;
use crossbeam_utils::Backoff;
use serde::{Deserialize, Serialize};

/// How a thread waits between two optimistic attempts after a failed validation.
///
/// This only tunes throughput under contention; it never changes what an
/// operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Retry immediately after a single spin-loop hint.
    Spin,
    /// Bounded exponential backoff that falls back to yielding the thread.
    #[default]
    Backoff,
}

impl RetryPolicy {
    /// Fresh per-operation backoff state, if this policy uses one.
    pub(crate) fn backoff(self) -> Option<Backoff> {
        match self {
            Self::Spin => None,
            Self::Backoff => Some(Backoff::new()),
        }
    }
}

/// Construction parameters for an [`OptimisticList`](crate::OptimisticList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Number of node slots; identifiers range over `0..capacity`.
    pub capacity: usize,
    /// Pause strategy between failed attempts.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ListConfig {
    /// A configuration with `capacity` slots and the default retry policy.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Parses and validates a JSON configuration such as
    /// `{"capacity": 11, "retry": "spin"}`.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration describes a constructible list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_default_retry() {
        let config = ListConfig::from_json(r#"{"capacity": 11}"#).unwrap();
        assert_eq!(config, ListConfig::new(11));
        assert_eq!(config.retry, RetryPolicy::Backoff);
    }

    #[test]
    fn test_parse_spin_policy() {
        let config = ListConfig::from_json(r#"{"capacity": 4, "retry": "spin"}"#).unwrap();
        assert_eq!(config.retry, RetryPolicy::Spin);
        assert!(config.retry.backoff().is_none());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = ListConfig::from_json(r#"{"capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_rejects_malformed_text() {
        let err = ListConfig::from_json(r#"{"capacity": "many"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = ListConfig::new(32).with_retry(RetryPolicy::Spin);
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(text, r#"{"capacity":32,"retry":"spin"}"#);
    }
}
