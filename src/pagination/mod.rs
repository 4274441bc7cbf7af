//! Pagination module
//!
//! Follows a query's continuation cursors until the service reports the
//! last page, collecting every record in arrival order.
//!
//! # Overview
//!
//! - `Page` - one parsed response: records, `done`, cursor
//! - `PageFetcher` - first-page and continuation calls through the retry policy
//! - `ResultAccumulator` - order-preserving record collection
//! - `PaginationLoop` - the sequential fetch loop with page cap, timeout and
//!   cancellation
//! - `retrieve` - one-call entry point with default limits

mod accumulator;
mod fetcher;
mod pager;
mod types;

pub use accumulator::ResultAccumulator;
pub use fetcher::{FetchError, Fetched, PageFetcher};
pub use pager::{retrieve, PaginationLoop};
pub use types::{Page, PaginationConfig, ResultSet, CURSOR_FIELDS, DEFAULT_MAX_PAGES};

#[cfg(test)]
mod tests;
