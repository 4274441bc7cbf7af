//! Error types for paged-query
//!
//! Two layers of errors live here. [`Error`] describes a single failed
//! operation (one HTTP call, one token request, one config load).
//! [`RetrievalError`] describes how a whole paginated retrieval ended when it
//! did not produce a result set.

use std::time::Duration;
use thiserror::Error;

/// The main error type for service calls, configuration and auth
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// General configuration problem
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// A required config field is absent
    #[error("Missing required config field: {field}")]
    MissingConfigField {
        /// Field or flag name
        field: String,
    },

    /// A config field holds an unusable value
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue {
        /// Field or flag name
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Config text is not valid YAML
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON (de)serialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    /// The service refused the credentials
    #[error("Authentication failed: {message}")]
    Auth {
        /// Detail from the token endpoint
        message: String,
    },

    /// A token could not be refreshed
    #[error("Token refresh failed: {message}")]
    TokenRefresh {
        /// Detail from the token endpoint
        message: String,
    },

    /// The OAuth2 exchange returned something unusable
    #[error("OAuth2 error: {message}")]
    OAuth2 {
        /// What was wrong with the exchange
        message: String,
    },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    /// Transport-level failure from reqwest
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 429
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// HTTP 429
    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds from `Retry-After`, 0 when absent
        retry_after_seconds: u64,
    },

    /// The call exceeded the per-request timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout
        timeout_ms: u64,
    },

    /// A URL could not be built or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A success response whose body is not JSON
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Parser message
        message: String,
    },

    // ============================================================================
    // Template Errors
    // ============================================================================
    /// Placeholder syntax error
    #[error("Template error: {message}")]
    Template {
        /// What is wrong
        message: String,
    },

    /// A placeholder names an unset variable
    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable {
        /// Variable name
        variable: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Filesystem or stream failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file does not exist
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path as given
        path: String,
    },

    // ============================================================================
    // Retrieval Errors
    // ============================================================================
    /// A paginated retrieval ended without a result set
    #[error(transparent)]
    Retrieval(Box<RetrievalError>),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<RetrievalError> for Error {
    fn from(e: RetrievalError) -> Self {
        Error::Retrieval(Box::new(e))
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// Rate limiting, timeouts, connection failures, bodies cut off or
    /// replaced by a proxy page, and gateway/server statuses may clear on
    /// their own. Everything else (bad query, bad credentials, bad config)
    /// will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. } | Error::Timeout { .. } | Error::Decode { .. } => true,
            Error::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_decode()
            }
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Server-requested wait before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited {
                retry_after_seconds,
            } if *retry_after_seconds > 0 => Some(Duration::from_secs(*retry_after_seconds)),
            _ => None,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        408 | 429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Result type alias for paged-query
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Retrieval Errors
// ============================================================================

/// Terminal outcome of a retrieval that did not complete.
///
/// Every variant carries the number of pages that were fetched successfully
/// before the failure. Those pages' records are not returned.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The service answered with a page that cannot be followed
    #[error("Malformed page after {pages_completed} page(s): {reason}")]
    MalformedPage {
        /// What was wrong with the page
        reason: String,
        /// Pages accepted before this one
        pages_completed: usize,
    },

    /// Every attempt for one page failed
    #[error(
        "Retrieval failed after {attempts} attempt(s) ({pages_completed} page(s) completed): {source}"
    )]
    RetrievalExhausted {
        /// Calls made for the failing page
        attempts: u32,
        /// Pages accepted before the failing one
        pages_completed: usize,
        /// Failure of the last attempt
        #[source]
        source: Error,
    },

    /// A failure that retrying cannot fix
    #[error("Request rejected after {attempts} attempt(s) ({pages_completed} page(s) completed): {source}")]
    Rejected {
        /// Calls made for the failing page
        attempts: u32,
        /// Pages accepted before the failing one
        pages_completed: usize,
        /// The permanent failure
        #[source]
        source: Error,
    },

    /// The service kept reporting more pages past the configured cap
    #[error("Service still reported more pages after {limit} page(s)")]
    TooManyPages {
        /// Configured page cap
        limit: usize,
    },

    /// The caller cancelled the retrieval
    #[error("Retrieval cancelled after {pages_completed} page(s)")]
    Cancelled {
        /// Pages accepted before cancellation
        pages_completed: usize,
    },

    /// The overall retrieval timeout elapsed
    #[error("Retrieval timed out after {elapsed_ms}ms ({pages_completed} page(s) completed)")]
    DeadlineExceeded {
        /// Time spent when the deadline was hit
        elapsed_ms: u64,
        /// Pages accepted before the deadline
        pages_completed: usize,
    },
}

impl RetrievalError {
    /// Pages successfully fetched before the retrieval stopped
    pub fn pages_completed(&self) -> usize {
        match self {
            Self::MalformedPage {
                pages_completed, ..
            }
            | Self::RetrievalExhausted {
                pages_completed, ..
            }
            | Self::Rejected {
                pages_completed, ..
            }
            | Self::Cancelled { pages_completed }
            | Self::DeadlineExceeded {
                pages_completed, ..
            } => *pages_completed,
            Self::TooManyPages { limit } => *limit,
        }
    }

    /// Attempts spent on the page that failed, when a call failed
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetrievalExhausted { attempts, .. } | Self::Rejected { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// The last underlying service failure, when there was one
    pub fn last_failure(&self) -> Option<&Error> {
        match self {
            Self::RetrievalExhausted { source, .. } | Self::Rejected { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
