//! Common types used throughout paged-query
//!
//! Shared type definitions and type aliases used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single record returned by the query service: named fields, possibly nested
pub type Record = JsonObject;

/// Raw body of one query service response, before page parsing
pub type RawResponse = JsonValue;

// ============================================================================
// Query
// ============================================================================

/// A fully built query, treated as an opaque string by the retrieval engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Wrap a query string
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The query text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self(text)
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Continuation token handed back by the service. Passed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a continuation token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// How the delay between attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Same delay before every retry
    #[default]
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    Exponential,
}

// ============================================================================
// Retry Classification
// ============================================================================

/// Which failures the retry policy is allowed to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Only failures that may clear on their own (rate limits, timeouts, 5xx)
    #[default]
    Transient,
    /// Every failure, regardless of cause
    #[serde(alias = "any")]
    AnyFailure,
}
