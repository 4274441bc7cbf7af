//! Tests for pagination module

use super::*;
use crate::error::{Error, Result, RetrievalError};
use crate::retry::RetryConfig;
use crate::service::QueryService;
use crate::types::{Cursor, Query, RawResponse, RetryOn};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted service
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Query(String),
    QueryMore(String),
}

/// Answers calls from a fixed script and records what was asked
#[derive(Default)]
struct ScriptedService {
    responses: Mutex<VecDeque<Result<RawResponse>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    fn new(responses: Vec<Result<RawResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn pages(pages: Vec<Value>) -> Self {
        Self::new(pages.into_iter().map(Ok).collect())
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, call: Call) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("script exhausted".to_string())))
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn query(&self, query: &Query) -> Result<RawResponse> {
        self.next(Call::Query(query.as_str().to_string()))
    }

    async fn query_more(&self, cursor: &Cursor) -> Result<RawResponse> {
        self.next(Call::QueryMore(cursor.as_str().to_string()))
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig::query().with_delay(Duration::from_millis(1))
}

fn query() -> Query {
    Query::new("SELECT Id FROM pse__Timecard__c")
}

fn ids(result: &ResultSet) -> Vec<String> {
    result
        .iter()
        .map(|r| r["Id"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn transient() -> Result<RawResponse> {
    Err(Error::Timeout { timeout_ms: 100 })
}

// ============================================================================
// Page parsing Tests
// ============================================================================

#[test]
fn test_page_missing_records_is_empty_final() {
    let page = Page::from_response(json!({})).unwrap();
    assert!(page.records.is_empty());
    assert!(page.done);
    assert!(page.next_cursor().is_none());
}

#[test]
fn test_page_null_body_is_empty_final() {
    let page = Page::from_response(Value::Null).unwrap();
    assert_eq!(page, Page::last(Vec::new()));
    assert!(page.next_cursor().is_none());
}

#[tokio::test]
async fn test_null_body_ends_retrieval_with_collected_records() {
    let service = ScriptedService::pages(vec![
        json!({"records": [{"Id": "r1"}], "done": false, "nextRecordsUrl": "/c1"}),
        Value::Null,
    ]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), vec!["r1"]);
    assert_eq!(result.pages(), 2);
}

#[test]
fn test_page_null_records_is_empty() {
    let page = Page::from_response(json!({"records": null, "done": true})).unwrap();
    assert!(page.records.is_empty());
}

#[test]
fn test_page_only_boolean_false_continues() {
    let page = Page::from_response(json!({"records": [], "done": "false"})).unwrap();
    assert!(page.done);

    let page = Page::from_response(json!({"records": [], "done": true, "nextRecordsUrl": "/x"}))
        .unwrap();
    assert!(page.done);
    assert!(page.cursor.is_none());
}

#[test]
fn test_page_with_next_records_url() {
    let page = Page::from_response(json!({
        "totalSize": 4000,
        "done": false,
        "nextRecordsUrl": "/services/data/v59.0/query/01g-2000",
        "records": [{"Id": "a"}, {"Id": "b"}]
    }))
    .unwrap();

    assert!(!page.done);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total_size, Some(4000));
    assert_eq!(
        page.next_cursor(),
        Some(&Cursor::new("/services/data/v59.0/query/01g-2000"))
    );
}

#[test]
fn test_page_with_continuation_token() {
    let page = Page::from_response(json!({
        "done": false,
        "continuationToken": "c1",
        "records": []
    }))
    .unwrap();
    assert_eq!(page.next_cursor(), Some(&Cursor::new("c1")));
}

#[test]
fn test_page_missing_cursor_is_malformed() {
    let err = Page::from_response(json!({"done": false, "records": [{"Id": "a"}]})).unwrap_err();
    assert!(err.contains("no continuation token"));

    let err = Page::from_response(json!({"done": false, "nextRecordsUrl": null})).unwrap_err();
    assert!(err.contains("no continuation token"));
}

#[test]
fn test_page_bad_cursor_is_malformed() {
    let err = Page::from_response(json!({"done": false, "nextRecordsUrl": ""})).unwrap_err();
    assert!(err.contains("empty"));

    let err = Page::from_response(json!({"done": false, "nextRecordsUrl": 42})).unwrap_err();
    assert!(err.contains("a number"));
}

#[test]
fn test_page_bad_records_are_malformed() {
    let err = Page::from_response(json!({"records": {"Id": "a"}})).unwrap_err();
    assert!(err.contains("'records' is an object"));

    let err = Page::from_response(json!({"records": [{"Id": "a"}, "b"]})).unwrap_err();
    assert!(err.contains("record 1 is a string"));

    let err = Page::from_response(json!([{"Id": "a"}])).unwrap_err();
    assert!(err.contains("expected a JSON object"));
}

// ============================================================================
// ResultAccumulator Tests
// ============================================================================

fn records(ids: &[&str]) -> Vec<crate::types::Record> {
    ids.iter()
        .map(|id| json!({ "Id": id }).as_object().cloned().unwrap_or_default())
        .collect()
}

#[test]
fn test_accumulator_preserves_order() {
    let mut acc = ResultAccumulator::new();
    assert!(acc.is_empty());

    acc.append(records(&["r1", "r2"]));
    acc.append(Vec::new());
    acc.append(records(&["r3"]));

    assert_eq!(acc.len(), 3);
    assert_eq!(acc.pages(), 3);

    let collected: Vec<_> = acc
        .collect()
        .into_iter()
        .map(|r| r["Id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(collected, vec!["r1", "r2", "r3"]);
}

#[test]
fn test_accumulator_keeps_duplicates() {
    let mut acc = ResultAccumulator::new();
    acc.append(records(&["r1"]));
    acc.append(records(&["r1"]));
    assert_eq!(acc.len(), 2);
}

#[test]
fn test_accumulator_reserve_is_bounded() {
    let mut acc = ResultAccumulator::new();
    acc.reserve_total(u64::MAX);
    acc.append(records(&["r1"]));
    assert_eq!(acc.len(), 1);
}

// ============================================================================
// PaginationConfig Tests
// ============================================================================

#[test]
fn test_pagination_config_default() {
    let config = PaginationConfig::default();
    assert_eq!(config.max_pages, Some(DEFAULT_MAX_PAGES));
    assert!(config.timeout.is_none());

    let config = PaginationConfig::new()
        .with_max_pages(5)
        .with_timeout(Duration::from_secs(1));
    assert_eq!(config.max_pages, Some(5));
    assert_eq!(config.timeout, Some(Duration::from_secs(1)));
    assert_eq!(PaginationConfig::new().unbounded().max_pages, None);
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_two_page_scenario() {
    let service = ScriptedService::pages(vec![
        json!({"records": [{"Id": "r1"}, {"Id": "r2"}], "done": false, "continuationToken": "c1"}),
        json!({"records": [{"Id": "r3"}], "done": true}),
    ]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), vec!["r1", "r2", "r3"]);
    assert_eq!(result.pages(), 2);
    assert_eq!(result.attempts(), 2);
    assert_eq!(
        service.calls(),
        vec![
            Call::Query("SELECT Id FROM pse__Timecard__c".to_string()),
            Call::QueryMore("c1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_completeness_over_many_pages() {
    let mut pages = Vec::new();
    let mut expected = Vec::new();
    for n in 0..5 {
        let recs: Vec<Value> = (0..3).map(|i| json!({"Id": format!("p{n}r{i}")})).collect();
        expected.extend((0..3).map(|i| format!("p{n}r{i}")));
        if n < 4 {
            pages.push(json!({"records": recs, "done": false, "nextRecordsUrl": format!("/next/{n}")}));
        } else {
            pages.push(json!({"records": recs, "done": true}));
        }
    }
    let service = ScriptedService::pages(pages);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), expected);
    assert_eq!(result.pages(), 5);

    // Each continuation uses exactly the cursor of the page before it
    let cursors: Vec<_> = service
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::QueryMore(cursor) => Some(cursor),
            Call::Query(_) => None,
        })
        .collect();
    assert_eq!(cursors, vec!["/next/0", "/next/1", "/next/2", "/next/3"]);
}

#[tokio::test]
async fn test_single_page_makes_no_continuation_calls() {
    let service = ScriptedService::pages(vec![json!({"records": [{"Id": "only"}], "done": true})]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), vec!["only"]);
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test]
async fn test_empty_result() {
    let service = ScriptedService::pages(vec![json!({"totalSize": 0, "done": true, "records": []})]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(result.pages(), 1);
}

#[tokio::test]
async fn test_done_page_is_never_followed() {
    let service = ScriptedService::pages(vec![
        json!({"records": [{"Id": "r1"}], "done": true}),
        json!({"records": [{"Id": "extra"}], "done": true}),
    ]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), vec!["r1"]);
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test]
async fn test_retry_then_success() {
    let service = ScriptedService::new(vec![
        transient(),
        transient(),
        Ok(json!({"records": [{"Id": "r1"}], "done": true})),
    ]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), vec!["r1"]);
    assert_eq!(result.attempts(), 3);
    assert_eq!(service.calls().len(), 3);
}

#[tokio::test]
async fn test_retry_on_continuation_reuses_cursor() {
    let service = ScriptedService::new(vec![
        Ok(json!({"records": [{"Id": "r1"}], "done": false, "nextRecordsUrl": "/c1"})),
        Err(Error::RateLimited {
            retry_after_seconds: 0,
        }),
        Ok(json!({"records": [{"Id": "r2"}], "done": true})),
    ]);

    let result = retrieve(&service, &query(), fast_retry()).await.unwrap();

    assert_eq!(ids(&result), vec!["r1", "r2"]);
    assert_eq!(result.attempts(), 3);
    assert_eq!(
        &service.calls()[1..],
        &[
            Call::QueryMore("/c1".to_string()),
            Call::QueryMore("/c1".to_string())
        ]
    );
}

#[tokio::test]
async fn test_exhausted_on_first_page() {
    let service = ScriptedService::new(vec![transient(), transient(), transient()]);

    let err = retrieve(&service, &query(), fast_retry()).await.unwrap_err();

    assert_eq!(service.calls().len(), 3);
    match err {
        RetrievalError::RetrievalExhausted {
            attempts,
            pages_completed,
            source,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(pages_completed, 0);
            assert!(matches!(source, Error::Timeout { .. }));
        }
        other => panic!("Expected RetrievalExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exhausted_on_later_page_discards_records() {
    let service = ScriptedService::new(vec![
        Ok(json!({"records": [{"Id": "r1"}], "done": false, "nextRecordsUrl": "/c1"})),
        transient(),
        transient(),
        transient(),
    ]);

    let err = retrieve(&service, &query(), fast_retry()).await.unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::RetrievalExhausted {
            attempts: 3,
            pages_completed: 1,
            ..
        }
    ));
    assert_eq!(service.calls().len(), 4);
}

#[tokio::test]
async fn test_malformed_page_fails_immediately() {
    let service = ScriptedService::pages(vec![
        json!({"records": [{"Id": "r1"}], "done": false}),
        json!({"records": [{"Id": "never"}], "done": true}),
    ]);

    let err = retrieve(&service, &query(), fast_retry()).await.unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::MalformedPage {
            pages_completed: 0,
            ..
        }
    ));
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test]
async fn test_permanent_failure_is_rejected() {
    let service = ScriptedService::new(vec![Err(Error::http_status(400, "MALFORMED_QUERY"))]);

    let err = retrieve(&service, &query(), fast_retry()).await.unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::Rejected {
            attempts: 1,
            pages_completed: 0,
            ..
        }
    ));
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test]
async fn test_any_failure_mode_retries_permanent_errors() {
    let service = ScriptedService::new(vec![
        Err(Error::http_status(400, "flaky gateway")),
        Ok(json!({"records": [{"Id": "r1"}], "done": true})),
    ]);

    let retry = fast_retry().with_retry_on(RetryOn::AnyFailure);
    let result = retrieve(&service, &query(), retry).await.unwrap();

    assert_eq!(ids(&result), vec!["r1"]);
    assert_eq!(result.attempts(), 2);
}

#[tokio::test]
async fn test_same_script_yields_same_result() {
    let script = || {
        ScriptedService::new(vec![
            Ok(json!({"records": [{"Id": "r1"}, {"Id": "r2"}], "done": false, "nextRecordsUrl": "/c1"})),
            transient(),
            Ok(json!({"records": [{"Id": "r3"}], "done": true})),
        ])
    };

    let first = retrieve(&script(), &query(), fast_retry()).await.unwrap();
    let second = retrieve(&script(), &query(), fast_retry()).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_page_cap() {
    let service = ScriptedService::pages(vec![
        json!({"records": [{"Id": "r1"}], "done": false, "nextRecordsUrl": "/c1"}),
        json!({"records": [{"Id": "r2"}], "done": false, "nextRecordsUrl": "/c2"}),
        json!({"records": [{"Id": "r3"}], "done": true}),
    ]);

    let err = PaginationLoop::new(&service, fast_retry())
        .with_config(PaginationConfig::new().with_max_pages(2))
        .run(&query())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrievalError::TooManyPages { limit: 2 }));
    assert_eq!(service.calls().len(), 2);
}

#[tokio::test]
async fn test_page_cap_allows_final_page() {
    let service = ScriptedService::pages(vec![
        json!({"records": [{"Id": "r1"}], "done": false, "nextRecordsUrl": "/c1"}),
        json!({"records": [{"Id": "r2"}], "done": true}),
    ]);

    let result = PaginationLoop::new(&service, fast_retry())
        .with_config(PaginationConfig::new().with_max_pages(2))
        .run(&query())
        .await
        .unwrap();

    assert_eq!(ids(&result), vec!["r1", "r2"]);
}

#[tokio::test]
async fn test_cancelled_before_first_request() {
    let service = ScriptedService::pages(vec![json!({"records": [], "done": true})]);
    let token = CancellationToken::new();
    token.cancel();

    let err = PaginationLoop::new(&service, fast_retry())
        .with_cancellation(token)
        .run(&query())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::Cancelled { pages_completed: 0 }
    ));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_deadline_checked_before_request() {
    let service = ScriptedService::pages(vec![json!({"records": [], "done": true})]);

    let err = PaginationLoop::new(&service, fast_retry())
        .with_config(PaginationConfig::new().with_timeout(Duration::ZERO))
        .run(&query())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::DeadlineExceeded {
            pages_completed: 0,
            ..
        }
    ));
    assert!(service.calls().is_empty());
}
