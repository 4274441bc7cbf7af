//! Retry module
//!
//! Runs a single network operation with a bounded number of attempts.
//!
//! # Overview
//!
//! - `RetryConfig` - attempt budget, delay and backoff, with the `query()`
//!   and `export()` presets
//! - `RetryPolicy` - executes an async operation under a `RetryConfig`
//! - `RetryError` - how the attempt budget ended when no attempt succeeded
//!
//! The policy never inspects the value an operation produces. It only looks
//! at failures, classifies them through `Error::is_retryable` and the
//! configured `RetryOn`, and sleeps between attempts.

mod policy;
mod types;

pub use policy::RetryPolicy;
pub use types::{Retried, RetryAttempt, RetryConfig, RetryError};
