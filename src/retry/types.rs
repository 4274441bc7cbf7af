//! Retry configuration and outcome types

use crate::error::Error;
use crate::types::{BackoffType, RetryOn};
use std::time::Duration;

/// Configuration for one retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts allowed, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub delay: Duration,
    /// How the delay grows on later retries
    pub backoff: BackoffType,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Which failures are retried
    pub retry_on: RetryOn,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::query()
    }
}

impl RetryConfig {
    /// Preset for query execution: 3 attempts, 1s apart
    pub fn query() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            backoff: BackoffType::Constant,
            max_delay: Duration::from_secs(60),
            retry_on: RetryOn::Transient,
        }
    }

    /// Preset for document export retrieval: 5 attempts, 3s apart
    pub fn export() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(3000),
            ..Self::query()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "query" => Some(Self::query()),
            "export" => Some(Self::export()),
            _ => None,
        }
    }

    /// Names accepted by [`RetryConfig::preset`]
    pub fn preset_names() -> &'static [&'static str] {
        &["query", "export"]
    }

    /// Set the attempt budget
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the backoff strategy and its cap
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffType, max_delay: Duration) -> Self {
        self.backoff = backoff;
        self.max_delay = max_delay;
        self
    }

    /// Set which failures are retried
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Attempts that will actually be made; zero is treated as one
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// One failed attempt: its 1-based number and what went wrong
#[derive(Debug)]
pub struct RetryAttempt {
    /// Attempt number, starting at 1
    pub number: u32,
    /// The failure reported by that attempt
    pub error: Error,
}

/// A successful result and the attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    /// The value produced by the successful attempt
    pub value: T,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Why a retry policy gave up
#[derive(Debug)]
pub enum RetryError {
    /// The attempt budget ran out; holds the final attempt
    Exhausted(RetryAttempt),
    /// A failure the policy may not retry; holds that attempt
    Permanent(RetryAttempt),
    /// Cancelled while waiting between attempts
    Cancelled {
        /// Attempts made before cancellation
        attempts: u32,
    },
}

impl RetryError {
    /// Attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted(last) | Self::Permanent(last) => last.number,
            Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The last failure, if an attempt failed
    pub fn last_error(&self) -> Option<&Error> {
        match self {
            Self::Exhausted(last) | Self::Permanent(last) => Some(&last.error),
            Self::Cancelled { .. } => None,
        }
    }
}
