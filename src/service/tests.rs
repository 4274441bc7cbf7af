//! Tests for the query service module

use super::*;
use crate::error::Error;
use crate::types::{Cursor, Query};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> RestQueryService {
    let config = RestServiceConfig::builder()
        .instance_url(server.uri())
        .api_version("v59.0")
        .no_rate_limit()
        .build();
    RestQueryService::new(config).unwrap()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_rest_service_config_default() {
    let config = RestServiceConfig::default();
    assert_eq!(config.api_version, "59.0");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.batch_size.is_none());
    assert!(!config.include_deleted);
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("paged-query/"));
}

#[test]
fn test_rest_service_config_builder() {
    let config = RestServiceConfig::builder()
        .instance_url("https://example.my.salesforce.com")
        .api_version("60.0")
        .timeout(Duration::from_secs(5))
        .batch_size(2000)
        .include_deleted(true)
        .rate_limit(RateLimiterConfig::new(5, 5))
        .header("X-Trace", "abc")
        .user_agent("reports/1.0")
        .build();

    assert_eq!(config.instance_url, "https://example.my.salesforce.com");
    assert_eq!(config.api_version, "60.0");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.batch_size, Some(2000));
    assert!(config.include_deleted);
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(5, 5)));
    assert_eq!(config.default_headers.get("X-Trace"), Some(&"abc".to_string()));
    assert_eq!(config.user_agent, "reports/1.0");
}

// ============================================================================
// URL Tests
// ============================================================================

#[test]
fn test_query_url() {
    let config = RestServiceConfig::builder()
        .instance_url("https://example.my.salesforce.com/")
        .api_version("v59.0")
        .build();
    let service = RestQueryService::new(config).unwrap();
    assert_eq!(
        service.query_url(),
        "https://example.my.salesforce.com/services/data/v59.0/query"
    );
    assert!(service.has_rate_limiter());

    let config = RestServiceConfig::builder()
        .instance_url("https://example.my.salesforce.com")
        .include_deleted(true)
        .build();
    let service = RestQueryService::new(config).unwrap();
    assert_eq!(
        service.query_url(),
        "https://example.my.salesforce.com/services/data/v59.0/queryAll"
    );
}

#[test]
fn test_continuation_url_forms() {
    let config = RestServiceConfig::builder()
        .instance_url("https://example.my.salesforce.com")
        .build();
    let service = RestQueryService::new(config).unwrap();

    assert_eq!(
        service.continuation_url(&Cursor::new("/services/data/v59.0/query/01gABC-2000")),
        "https://example.my.salesforce.com/services/data/v59.0/query/01gABC-2000"
    );
    assert_eq!(
        service.continuation_url(&Cursor::new("https://other.example.com/next?page=2")),
        "https://other.example.com/next?page=2"
    );
    assert_eq!(
        service.continuation_url(&Cursor::new("01gABC-4000")),
        "https://example.my.salesforce.com/services/data/v59.0/query/01gABC-4000"
    );
}

// ============================================================================
// Request Tests
// ============================================================================

#[tokio::test]
async fn test_query_sends_soql_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .and(query_param("q", "SELECT Id FROM Account"))
        .and(header("Sforce-Query-Options", "batchSize=2000"))
        .and(header("Authorization", "Bearer tok"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{"Id": "001"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = RestServiceConfig::builder()
        .instance_url(mock_server.uri())
        .batch_size(2000)
        .no_rate_limit()
        .build();
    let service = RestQueryService::with_auth(
        config,
        crate::auth::AuthConfig::Bearer {
            token: "tok".to_string(),
        },
    )
    .unwrap();

    let body = service
        .query(&Query::new("SELECT Id FROM Account"))
        .await
        .unwrap();
    assert_eq!(body["records"][0]["Id"], "001");
}

#[tokio::test]
async fn test_query_more_follows_cursor_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query/01gXYZ-2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "done": true,
            "records": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let body = service
        .query_more(&Cursor::new("/services/data/v59.0/query/01gXYZ-2000"))
        .await
        .unwrap();
    assert_eq!(body["done"], true);
}

#[tokio::test]
async fn test_rate_limited_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let err = service.query(&Query::new("SELECT Id FROM Account")).await.unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_seconds: 7
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let err = service.query(&Query::new("SELECT Id FROM Account")).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_query_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "errorCode": "MALFORMED_QUERY",
            "message": "unexpected token: FORM"
        }])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let err = service.query(&Query::new("SELECT Id FORM Account")).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
    assert!(err.to_string().contains("MALFORMED_QUERY"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let err = service.query(&Query::new("SELECT Id FROM Account")).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"done": true}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let config = RestServiceConfig::builder()
        .instance_url(mock_server.uri())
        .timeout(Duration::from_millis(50))
        .no_rate_limit()
        .build();
    let service = RestQueryService::new(config).unwrap();
    let err = service.query(&Query::new("SELECT Id FROM Account")).await.unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_arc_service_delegates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service: std::sync::Arc<dyn QueryService> = std::sync::Arc::new(service_for(&mock_server));
    let body = service.query(&Query::new("SELECT Id FROM Account")).await.unwrap();
    assert_eq!(body["done"], true);
}
