//! Bounded retry around a single async operation

use super::types::{Retried, RetryAttempt, RetryConfig, RetryError};
use crate::error::{Error, Result};
use crate::types::{BackoffType, RetryOn};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executes an operation, retrying failures under a [`RetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
    cancel: Option<CancellationToken>,
}

impl RetryPolicy {
    /// Create a policy from a config
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Abort the wait between attempts when this token is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the retry config
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// `label` names the operation in log lines. `op` is called once per
    /// attempt and must be safe to repeat.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> std::result::Result<Retried<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.effective_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{label} succeeded on attempt {attempt}/{max_attempts}");
                    }
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            if !self.should_retry(&error) {
                warn!("{label} attempt {attempt}/{max_attempts} failed permanently: {error}");
                return Err(RetryError::Permanent(RetryAttempt {
                    number: attempt,
                    error,
                }));
            }

            warn!("{label} attempt {attempt}/{max_attempts} failed: {error}");

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted(RetryAttempt {
                    number: attempt,
                    error,
                }));
            }

            let delay = self.delay_after(attempt, &error);
            debug!("Retrying {label} in {delay:?}");

            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            return Err(RetryError::Cancelled { attempts: attempt });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Whether the configured classification allows retrying this failure
    fn should_retry(&self, error: &Error) -> bool {
        match self.config.retry_on {
            RetryOn::AnyFailure => true,
            RetryOn::Transient => error.is_retryable(),
        }
    }

    /// Delay after the given 1-based failed attempt
    fn delay_after(&self, attempt: u32, error: &Error) -> Duration {
        let delay = self.calculate_backoff(attempt.saturating_sub(1));
        let delay = match error.retry_after() {
            Some(requested) if requested > delay => requested,
            _ => delay,
        };
        std::cmp::min(delay, self.cap())
    }

    /// Calculate backoff delay for a given 0-based retry index
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let base = self.config.delay;
        let delay = match self.config.backoff {
            BackoffType::Constant => base,
            BackoffType::Linear => base.checked_mul(retry + 1).unwrap_or(Duration::MAX),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(retry);
                base.checked_mul(factor).unwrap_or(Duration::MAX)
            }
        };

        std::cmp::min(delay, self.cap())
    }

    /// The configured delay is always honored even when it exceeds `max_delay`
    fn cap(&self) -> Duration {
        std::cmp::max(self.config.max_delay, self.config.delay)
    }
}
