//! Single-page fetches through the retry policy

use super::types::Page;
use crate::error::RetrievalError;
use crate::retry::{RetryError, RetryPolicy};
use crate::service::QueryService;
use crate::types::{Cursor, Query};

/// A parsed page and the attempts it took
#[derive(Debug)]
pub struct Fetched {
    /// The page
    pub page: Page,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Why a single page could not be fetched
#[derive(Debug)]
pub enum FetchError {
    /// The call failed under the retry policy
    Call(RetryError),
    /// The call succeeded but the body is not a followable page
    Malformed {
        /// What is wrong with the body
        reason: String,
        /// Attempts spent on the call
        attempts: u32,
    },
}

impl FetchError {
    /// Convert into the terminal error for the whole retrieval
    pub fn into_retrieval_error(self, pages_completed: usize) -> RetrievalError {
        match self {
            Self::Call(RetryError::Exhausted(last)) => RetrievalError::RetrievalExhausted {
                attempts: last.number,
                pages_completed,
                source: last.error,
            },
            Self::Call(RetryError::Permanent(last)) => RetrievalError::Rejected {
                attempts: last.number,
                pages_completed,
                source: last.error,
            },
            Self::Call(RetryError::Cancelled { .. }) => {
                RetrievalError::Cancelled { pages_completed }
            }
            Self::Malformed { reason, .. } => RetrievalError::MalformedPage {
                reason,
                pages_completed,
            },
        }
    }
}

/// Issues first-page and continuation calls against a [`QueryService`]
pub struct PageFetcher<'a, S: QueryService + ?Sized> {
    service: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: QueryService + ?Sized> PageFetcher<'a, S> {
    /// Create a fetcher
    pub fn new(service: &'a S, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Get the retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch the first page of a query
    pub async fn fetch_first(&self, query: &Query) -> Result<Fetched, FetchError> {
        let response = self
            .policy
            .run("Query", || self.service.query(query))
            .await
            .map_err(FetchError::Call)?;

        parse(response.value, response.attempts)
    }

    /// Fetch the page a cursor points at
    pub async fn fetch_next(&self, cursor: &Cursor) -> Result<Fetched, FetchError> {
        let response = self
            .policy
            .run("QueryMore", || self.service.query_more(cursor))
            .await
            .map_err(FetchError::Call)?;

        parse(response.value, response.attempts)
    }
}

// Runs outside the retry loop, so a malformed page is never retried.
fn parse(body: crate::types::RawResponse, attempts: u32) -> Result<Fetched, FetchError> {
    match Page::from_response(body) {
        Ok(page) => Ok(Fetched { page, attempts }),
        Err(reason) => Err(FetchError::Malformed { reason, attempts }),
    }
}
