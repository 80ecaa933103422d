use crate::core::RetryConfig;
use crate::errors::{FailureKind, FormError, Result};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// A user-facing interaction performed against a resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Click,
    Type(String),
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Click => f.write_str("click"),
            ActionKind::Type(_) => f.write_str("type"),
        }
    }
}

/// Bounded-retry contract for an actuation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    pause: Duration,
    recoverable: HashSet<FailureKind>,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(max_attempts: u32, pause: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(FormError::Configuration(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            pause,
            recoverable: [FailureKind::ClickIntercepted, FailureKind::StaleElement]
                .into_iter()
                .collect(),
        })
    }

    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        Self::new(config.max_attempts, Duration::from_millis(config.pause_ms))
    }

    /// Replaces the set of failure kinds retried in place.
    pub fn with_recoverable(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.recoverable = kinds.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn is_recoverable(&self, kind: FailureKind) -> bool {
        self.recoverable.contains(&kind)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            pause: Duration::from_secs(1),
            recoverable: [FailureKind::ClickIntercepted, FailureKind::StaleElement]
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, Duration::ZERO).is_err());
        let policy = RetryPolicy::new(1, Duration::ZERO).unwrap();
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_default_recoverable_kinds() {
        let policy = RetryPolicy::default();
        assert!(policy.is_recoverable(FailureKind::ClickIntercepted));
        assert!(policy.is_recoverable(FailureKind::StaleElement));
        assert!(!policy.is_recoverable(FailureKind::NotInteractable));
        assert!(!policy.is_recoverable(FailureKind::NotFound));

        let strict = policy.with_recoverable([FailureKind::StaleElement]);
        assert!(!strict.is_recoverable(FailureKind::ClickIntercepted));
    }
}
