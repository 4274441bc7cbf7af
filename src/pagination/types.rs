//! Pagination types
//!
//! Page parsing, the finished result set and loop configuration.

use crate::types::{Cursor, JsonValue, RawResponse, Record};
use std::time::Duration;

/// Response fields that may carry the continuation token, in lookup order
pub const CURSOR_FIELDS: [&str; 2] = ["nextRecordsUrl", "continuationToken"];

/// Default cap on pages fetched in one retrieval
pub const DEFAULT_MAX_PAGES: usize = 10_000;

// ============================================================================
// Page
// ============================================================================

/// One parsed service response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records in the order the service returned them
    pub records: Vec<Record>,
    /// True when no further pages exist
    pub done: bool,
    /// Continuation token, only present when `done` is false
    pub cursor: Option<Cursor>,
    /// Total matching records, when the service reports it
    pub total_size: Option<u64>,
}

impl Page {
    /// A final page
    pub fn last(records: Vec<Record>) -> Self {
        Self {
            records,
            done: true,
            cursor: None,
            total_size: None,
        }
    }

    /// A page followed by the page at `cursor`
    pub fn more(records: Vec<Record>, cursor: Cursor) -> Self {
        Self {
            records,
            done: false,
            cursor: Some(cursor),
            total_size: None,
        }
    }

    /// The cursor to follow, or `None` when this is the final page
    pub fn next_cursor(&self) -> Option<&Cursor> {
        if self.done {
            None
        } else {
            self.cursor.as_ref()
        }
    }

    /// Parse a raw response body.
    ///
    /// A null body or missing or null `records` is an empty page. Only `done: false`
    /// continues; a missing or non-boolean `done` ends the retrieval. A
    /// continuing page must carry a non-empty string cursor. The error is a
    /// human-readable reason.
    pub fn from_response(body: RawResponse) -> std::result::Result<Self, String> {
        let mut body = match body {
            JsonValue::Object(body) => body,
            JsonValue::Null => return Ok(Self::last(Vec::new())),
            other => {
                return Err(format!(
                    "expected a JSON object, got {}",
                    describe(&other)
                ))
            }
        };

        let records = match body.remove("records") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    JsonValue::Object(record) => Ok(record),
                    other => Err(format!(
                        "record {index} is {} rather than an object",
                        describe(&other)
                    )),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(format!(
                    "'records' is {} rather than an array",
                    describe(&other)
                ))
            }
        };

        let total_size = body.get("totalSize").and_then(JsonValue::as_u64);
        let done = !matches!(body.get("done"), Some(JsonValue::Bool(false)));

        if done {
            return Ok(Self {
                records,
                done,
                cursor: None,
                total_size,
            });
        }

        let cursor = CURSOR_FIELDS
            .iter()
            .find_map(|field| body.get(*field).filter(|value| !value.is_null()));

        match cursor {
            Some(JsonValue::String(token)) if !token.is_empty() => Ok(Self {
                records,
                done,
                cursor: Some(Cursor::new(token.clone())),
                total_size,
            }),
            Some(JsonValue::String(_)) => {
                Err("page reports more results but its continuation token is empty".to_string())
            }
            Some(other) => Err(format!(
                "continuation token is {} rather than a string",
                describe(other)
            )),
            None => Err("page reports more results but carries no continuation token".to_string()),
        }
    }
}

fn describe(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

// ============================================================================
// Result Set
// ============================================================================

/// Every record of a completed retrieval, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<Record>,
    pages: usize,
    attempts: u32,
}

impl ResultSet {
    /// Create a result set
    pub fn new(records: Vec<Record>, pages: usize, attempts: u32) -> Self {
        Self {
            records,
            pages,
            attempts,
        }
    }

    /// The records
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the query matched nothing
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pages fetched
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Network attempts made across all pages, including failed ones
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Iterate over the records
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Take ownership of the records
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl IntoIterator for ResultSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Pagination Config
// ============================================================================

/// Limits for one retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Maximum pages to fetch (None = unlimited)
    pub max_pages: Option<usize>,
    /// Overall time budget for the retrieval (None = unlimited)
    pub timeout: Option<Duration>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: Some(DEFAULT_MAX_PAGES),
            timeout: None,
        }
    }
}

impl PaginationConfig {
    /// Create a new pagination config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cap
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Remove the page cap
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_pages = None;
        self
    }

    /// Set the overall timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
