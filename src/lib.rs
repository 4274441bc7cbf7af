// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # paged-query
//!
//! Retrieves the complete result set of a query from a service that returns
//! results in pages. The first page comes from executing the query; every
//! following page is requested with the continuation token of the page
//! before it, until the service reports that no pages remain.
//!
//! Each request runs under a [`RetryConfig`]: transient failures (rate
//! limiting, timeouts, gateway errors) are retried with a delay, permanent
//! ones fail the retrieval at once. A retrieval either returns every record
//! in service order or an error saying how far it got. Partial results are
//! never returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paged_query::{retrieve, Query, RestQueryService, RestServiceConfig, RetryConfig};
//!
//! # async fn run() -> paged_query::Result<()> {
//! let config = RestServiceConfig::builder()
//!     .instance_url("https://example.my.salesforce.com")
//!     .batch_size(2000)
//!     .build();
//! let service = RestQueryService::new(config)?;
//!
//! let query = Query::new("SELECT Id, Name FROM pse__Proj__c");
//! let results = retrieve(&service, &query, RetryConfig::query()).await?;
//!
//! for record in &results {
//!     println!("{}", record["Name"]);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     PaginationLoop                       │
//! │  Start → Fetching → (Continuing → Fetching)* → Finished  │
//! └──────────────────────────────────────────────────────────┘
//!               │                              │
//!        ┌──────┴──────┐               ┌───────┴────────┐
//!        │ PageFetcher │               │ResultAccumulator│
//!        │ RetryPolicy │               └────────────────┘
//!        └──────┬──────┘
//!               │ query / query_more
//!        ┌──────┴───────────────────────┐
//!        │ QueryService                 │
//!        │  RestQueryService            │
//!        │  (Auth, RateLimiter, reqwest)│
//!        └──────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication for the query service
pub mod auth;

/// The query service boundary and its REST implementation
pub mod service;

/// Retry policy for single service calls
pub mod retry;

/// Cursor-following retrieval of complete result sets
pub mod pagination;

/// SOQL query building
pub mod query;

/// Placeholder interpolation for config files
pub mod template;

/// YAML configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result, RetrievalError};
pub use types::*;

// Re-export commonly used types
pub use pagination::{retrieve, PaginationConfig, PaginationLoop, ResultSet};
pub use query::SoqlBuilder;
pub use retry::{RetryConfig, RetryPolicy};
pub use service::{QueryService, RestQueryService, RestServiceConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
