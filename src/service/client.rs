//! REST query service client
//!
//! Speaks the `/services/data/vXX.X/query` API:
//! - `GET {instance}/services/data/v{version}/query?q={query}` for the first page
//! - `GET {instance}{nextRecordsUrl}` for each following page
//!
//! Each call is a single attempt. Failures are mapped onto `Error` variants
//! so the retry policy can tell transient failures from permanent ones.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::QueryService;
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::types::{Cursor, Query, RawResponse};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Header carrying the requested page size
pub const QUERY_OPTIONS_HEADER: &str = "Sforce-Query-Options";

/// Configuration for the REST query client
#[derive(Debug, Clone)]
pub struct RestServiceConfig {
    /// Instance base URL, e.g. `https://example.my.salesforce.com`
    pub instance_url: String,
    /// API version without the leading `v`, e.g. `59.0`
    pub api_version: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Requested records per page
    pub batch_size: Option<u32>,
    /// Use `queryAll` so deleted and archived records are included
    pub include_deleted: bool,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for RestServiceConfig {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            api_version: "59.0".to_string(),
            timeout: Duration::from_secs(30),
            batch_size: None,
            include_deleted: false,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("paged-query/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RestServiceConfig {
    /// Create a new config builder
    pub fn builder() -> RestServiceConfigBuilder {
        RestServiceConfigBuilder::default()
    }
}

/// Builder for [`RestServiceConfig`]
#[derive(Default)]
pub struct RestServiceConfigBuilder {
    config: RestServiceConfig,
}

impl RestServiceConfigBuilder {
    /// Set the instance URL
    pub fn instance_url(mut self, url: impl Into<String>) -> Self {
        self.config.instance_url = url.into();
        self
    }

    /// Set the API version (`59.0` or `v59.0`)
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Request a page size
    pub fn batch_size(mut self, size: u32) -> Self {
        self.config.batch_size = Some(size);
        self
    }

    /// Include deleted records
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.config.include_deleted = include;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> RestServiceConfig {
        self.config
    }
}

/// REST implementation of [`QueryService`]
pub struct RestQueryService {
    client: Client,
    config: RestServiceConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl RestQueryService {
    /// Create a client without authentication
    pub fn new(config: RestServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Create a client that authenticates every request
    pub fn with_auth(config: RestServiceConfig, auth_config: AuthConfig) -> Result<Self> {
        let mut service = Self::new(config)?;
        if auth_config != AuthConfig::None {
            service.authenticator = Some(Authenticator::with_client(
                auth_config,
                service.client.clone(),
            ));
        }
        Ok(service)
    }

    /// Get the client configuration
    pub fn config(&self) -> &RestServiceConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// URL of the query endpoint
    pub fn query_url(&self) -> String {
        let base = self.config.instance_url.trim_end_matches('/');
        let version = self.config.api_version.trim_start_matches('v');
        let endpoint = if self.config.include_deleted {
            "queryAll"
        } else {
            "query"
        };
        format!("{base}/services/data/v{version}/{endpoint}")
    }

    /// URL of the page a cursor points at.
    ///
    /// Absolute URLs are used as given, paths are resolved against the
    /// instance, and bare locators are appended to the query endpoint.
    pub fn continuation_url(&self, cursor: &Cursor) -> String {
        let cursor = cursor.as_str();
        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            return cursor.to_string();
        }

        if cursor.starts_with('/') {
            let base = self.config.instance_url.trim_end_matches('/');
            return format!("{base}{cursor}");
        }

        format!("{}/{cursor}", self.query_url())
    }

    /// Perform one GET and decode the JSON body
    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<RawResponse> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.get(url).header(ACCEPT, "application/json");

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(size) = self.config.batch_size {
            req = req.header(QUERY_OPTIONS_HEADER, format!("batchSize={size}"));
        }

        if !params.is_empty() {
            req = req.query(params);
        }

        if let Some(ref auth) = self.authenticator {
            req = auth.apply(req).await?;
        }

        let response = req.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_seconds: extract_retry_after(&response),
            });
        }

        if !status.is_success() {
            // A rejected session may have been revoked early; fetch a new
            // token on the next call instead of reusing the cached one.
            if status == StatusCode::UNAUTHORIZED {
                if let Some(ref auth) = self.authenticator {
                    auth.clear_cache().await;
                }
            }
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        debug!("GET {url} -> {} ({} bytes)", status.as_u16(), body.len());

        serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("Response from {url} is not valid JSON: {e}")))
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(e)
        }
    }
}

#[async_trait]
impl QueryService for RestQueryService {
    async fn query(&self, query: &Query) -> Result<RawResponse> {
        let url = self.query_url();
        self.get_json(&url, &[("q", query.as_str())]).await
    }

    async fn query_more(&self, cursor: &Cursor) -> Result<RawResponse> {
        let url = self.continuation_url(cursor);
        self.get_json(&url, &[]).await
    }
}

impl std::fmt::Debug for RestQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestQueryService")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Extract the Retry-After header in seconds, 0 when absent or unparseable
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}
