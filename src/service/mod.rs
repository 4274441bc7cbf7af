//! Query service module
//!
//! The boundary between the retrieval engine and the remote query API.
//!
//! # Overview
//!
//! - `QueryService` - the two calls the engine needs: run a query, continue
//!   from a cursor
//! - `RestQueryService` - REST implementation (`/services/data/vXX.X/query`)
//!   with auth, rate limiting and error classification
//! - `RateLimiter` - token bucket limiter applied before each call
//!
//! A service makes exactly one network attempt per call. Retrying is the
//! job of `retry::RetryPolicy`, so implementations must report failures
//! through `crate::Error` where `Error::is_retryable` tells the two kinds
//! apart.

mod client;
mod rate_limit;

pub use client::{RestQueryService, RestServiceConfig, RestServiceConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

use crate::error::Result;
use crate::types::{Cursor, Query, RawResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// A remote service that answers queries one page at a time
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Execute a fresh query and return its first page
    async fn query(&self, query: &Query) -> Result<RawResponse>;

    /// Fetch the page that `cursor` points at
    async fn query_more(&self, cursor: &Cursor) -> Result<RawResponse>;
}

#[async_trait]
impl<S: QueryService + ?Sized> QueryService for Arc<S> {
    async fn query(&self, query: &Query) -> Result<RawResponse> {
        (**self).query(query).await
    }

    async fn query_more(&self, cursor: &Cursor) -> Result<RawResponse> {
        (**self).query_more(cursor).await
    }
}

#[cfg(test)]
mod tests;
