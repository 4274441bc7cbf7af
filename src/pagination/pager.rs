//! Cursor-following pagination loop
//!
//! ```text
//! Start ──fetch_first──▶ Fetching ──done──▶ Finished
//!                          │  ▲
//!                   cursor │  │ fetch_next
//!                          ▼  │
//!                        Continuing
//! ```
//!
//! Any failed fetch, cancellation, timeout or page cap moves the loop to
//! `Failed`, which is the `Err` returned from [`PaginationLoop::run`].

use super::accumulator::ResultAccumulator;
use super::fetcher::{Fetched, PageFetcher};
use super::types::{PaginationConfig, ResultSet};
use crate::error::RetrievalError;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::service::QueryService;
use crate::types::{Cursor, Query};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// What the next request of the loop is
enum Step {
    Start,
    Continuing(Cursor),
}

/// Retrieves every page of a query from a [`QueryService`]
pub struct PaginationLoop<'a, S: QueryService + ?Sized> {
    service: &'a S,
    retry: RetryConfig,
    config: PaginationConfig,
    cancel: Option<CancellationToken>,
}

impl<'a, S: QueryService + ?Sized> PaginationLoop<'a, S> {
    /// Create a loop over `service` using `retry` for every call
    pub fn new(service: &'a S, retry: RetryConfig) -> Self {
        Self {
            service,
            retry,
            config: PaginationConfig::default(),
            cancel: None,
        }
    }

    /// Set the pagination limits
    #[must_use]
    pub fn with_config(mut self, config: PaginationConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop the retrieval when this token is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the pagination limits
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Run one retrieval to completion.
    ///
    /// Requests are strictly sequential: page n+1 is requested with exactly
    /// the cursor page n returned, and nothing is requested after a page
    /// reports it is the last. On any failure the records collected so far
    /// are dropped.
    pub async fn run(&self, query: &Query) -> Result<ResultSet, RetrievalError> {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);

        let mut policy = RetryPolicy::new(self.retry.clone());
        if let Some(ref token) = self.cancel {
            policy = policy.with_cancellation(token.clone());
        }
        let fetcher = PageFetcher::new(self.service, policy);

        let mut results = ResultAccumulator::new();
        let mut attempts = 0u32;
        let mut step = Step::Start;

        info!("Executing query: {query}");

        loop {
            self.check_interrupted(&results, started, deadline)
                .inspect_err(|e| error!("Query aborted: {e}"))?;

            let fetched = match &step {
                Step::Start => fetcher.fetch_first(query).await,
                Step::Continuing(cursor) => fetcher.fetch_next(cursor).await,
            };

            let Fetched {
                page,
                attempts: page_attempts,
            } = fetched.map_err(|e| {
                let e = e.into_retrieval_error(results.pages());
                error!("Query execution failed: {e}");
                e
            })?;
            attempts += page_attempts;

            if matches!(step, Step::Start) {
                if let Some(total) = page.total_size {
                    results.reserve_total(total);
                }
            }

            let next = page.next_cursor().cloned();
            let page_records = page.records.len();
            results.append(page.records);

            debug!(
                "Page {}: {page_records} records ({} total)",
                results.pages(),
                results.len()
            );

            let Some(cursor) = next else {
                break;
            };

            if results.pages() == 1 {
                info!(
                    "Query returned {} records initially, fetching remaining...",
                    results.len()
                );
            }

            if let Some(limit) = self.config.max_pages {
                if results.pages() >= limit {
                    let e = RetrievalError::TooManyPages { limit };
                    error!("Query aborted: {e}");
                    return Err(e);
                }
            }

            step = Step::Continuing(cursor);
        }

        let pages = results.pages();
        let records = results.collect();

        info!(
            "Query completed. Total records retrieved: {} ({pages} pages, {attempts} attempts, {:?})",
            records.len(),
            started.elapsed()
        );

        Ok(ResultSet::new(records, pages, attempts))
    }

    /// Cancellation and deadline checks made before every request
    fn check_interrupted(
        &self,
        results: &ResultAccumulator,
        started: Instant,
        deadline: Option<Instant>,
    ) -> Result<(), RetrievalError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(RetrievalError::Cancelled {
                pages_completed: results.pages(),
            });
        }

        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(RetrievalError::DeadlineExceeded {
                    elapsed_ms: now.duration_since(started).as_millis() as u64,
                    pages_completed: results.pages(),
                });
            }
        }

        Ok(())
    }
}

/// Retrieve every record of `query` with the default pagination limits
pub async fn retrieve<S: QueryService + ?Sized>(
    service: &S,
    query: &Query,
    retry: RetryConfig,
) -> Result<ResultSet, RetrievalError> {
    PaginationLoop::new(service, retry).run(query).await
}
