//! Configuration file for the paged-query binary
//!
//! One YAML document with four sections: `service` (where and how to call the
//! query API), `auth`, `retry` and `pagination`. Only `service.instance_url`
//! is required; everything else has a default.
//!
//! `{{ env.NAME }}` placeholders are substituted before the YAML is parsed.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::pagination::{PaginationConfig, DEFAULT_MAX_PAGES};
use crate::retry::RetryConfig;
use crate::service::{RateLimiterConfig, RestServiceConfig};
use crate::template;
use crate::types::{BackoffType, RetryOn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Smallest page size the query API accepts
pub const MIN_BATCH_SIZE: u32 = 200;

/// Largest page size the query API accepts
pub const MAX_BATCH_SIZE: u32 = 2000;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Query service endpoint settings
    pub service: ServiceSection,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Retry behavior for every service call
    #[serde(default)]
    pub retry: RetrySection,

    /// Limits for one retrieval
    #[serde(default)]
    pub pagination: PaginationSection,
}

// ============================================================================
// Sections
// ============================================================================

/// Query service endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Instance base URL
    pub instance_url: String,

    /// API version, with or without a leading `v`
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Requested records per page
    #[serde(default)]
    pub batch_size: Option<u32>,

    /// Include deleted and archived records
    #[serde(default)]
    pub include_deleted: bool,

    /// Client-side rate limit (`null` disables it)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_api_version() -> String {
    "59.0".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_rate_limit() -> Option<RateLimiterConfig> {
    Some(RateLimiterConfig::default())
}

/// Retry settings: a named preset plus optional overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySection {
    /// Preset name (`query` or `export`), `query` when absent
    #[serde(default)]
    pub preset: Option<String>,

    /// Total attempts per call
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Delay before the first retry
    #[serde(default)]
    pub delay_ms: Option<u64>,

    /// Delay growth
    #[serde(default)]
    pub backoff: Option<BackoffType>,

    /// Cap on any single delay
    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    /// Which failures are retried
    #[serde(default)]
    pub retry_on: Option<RetryOn>,
}

/// Pagination limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSection {
    /// Page cap (`null` removes it)
    #[serde(default = "default_max_pages")]
    pub max_pages: Option<usize>,

    /// Overall time budget for one retrieval
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for PaginationSection {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            timeout_seconds: None,
        }
    }
}

fn default_max_pages() -> Option<usize> {
    Some(DEFAULT_MAX_PAGES)
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a config file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::Io(e)
        }
    })?;

    load_config_from_str(&content)
}

/// Load and validate config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<AppConfig> {
    let rendered = template::render_env(yaml)?;
    let config: AppConfig = serde_yaml::from_str(&rendered)?;

    config.validate()?;
    Ok(config)
}

// ============================================================================
// Validation and Conversion
// ============================================================================

impl AppConfig {
    /// Check every value the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let service = &self.service;

        if service.instance_url.trim().is_empty() {
            return Err(Error::missing_field("service.instance_url"));
        }
        Url::parse(&service.instance_url)
            .map_err(|e| Error::invalid_value("service.instance_url", e.to_string()))?;

        if service.api_version.trim().trim_start_matches('v').is_empty() {
            return Err(Error::invalid_value(
                "service.api_version",
                "must not be empty",
            ));
        }

        if service.timeout_seconds == 0 {
            return Err(Error::invalid_value(
                "service.timeout_seconds",
                "must be at least 1",
            ));
        }

        if let Some(size) = service.batch_size {
            if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&size) {
                return Err(Error::invalid_value(
                    "service.batch_size",
                    format!("{size} is outside {MIN_BATCH_SIZE}..={MAX_BATCH_SIZE}"),
                ));
            }
        }

        if let Some(ref limit) = service.rate_limit {
            if limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "service.rate_limit.requests_per_second",
                    "must be at least 1",
                ));
            }
        }

        if let Some(ref name) = self.retry.preset {
            if RetryConfig::preset(name).is_none() {
                return Err(Error::invalid_value(
                    "retry.preset",
                    format!(
                        "unknown preset '{name}', expected one of: {}",
                        RetryConfig::preset_names().join(", ")
                    ),
                ));
            }
        }

        if self.retry.max_attempts == Some(0) {
            return Err(Error::invalid_value(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }

        if self.pagination.max_pages == Some(0) {
            return Err(Error::invalid_value(
                "pagination.max_pages",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Settings for the REST query client
    pub fn to_rest_config(&self) -> RestServiceConfig {
        let service = &self.service;

        let mut builder = RestServiceConfig::builder()
            .instance_url(service.instance_url.trim())
            .api_version(service.api_version.trim())
            .timeout(Duration::from_secs(service.timeout_seconds))
            .include_deleted(service.include_deleted);

        if let Some(size) = service.batch_size {
            builder = builder.batch_size(size);
        }

        builder = match service.rate_limit {
            Some(ref limit) => builder.rate_limit(limit.clone()),
            None => builder.no_rate_limit(),
        };

        for (key, value) in &service.headers {
            builder = builder.header(key, value);
        }

        builder.build()
    }

    /// The preset named in the file with its overrides applied
    pub fn to_retry_config(&self) -> Result<RetryConfig> {
        let section = &self.retry;

        let mut config = match section.preset {
            Some(ref name) => RetryConfig::preset(name)
                .ok_or_else(|| Error::invalid_value("retry.preset", format!("unknown preset '{name}'")))?,
            None => RetryConfig::query(),
        };

        if let Some(attempts) = section.max_attempts {
            config = config.with_max_attempts(attempts);
        }
        if let Some(delay) = section.delay_ms {
            config = config.with_delay(Duration::from_millis(delay));
        }
        if section.backoff.is_some() || section.max_delay_ms.is_some() {
            let backoff = section.backoff.unwrap_or(config.backoff);
            let max_delay = section
                .max_delay_ms
                .map_or(config.max_delay, Duration::from_millis);
            config = config.with_backoff(backoff, max_delay);
        }
        if let Some(retry_on) = section.retry_on {
            config = config.with_retry_on(retry_on);
        }

        Ok(config)
    }

    /// Limits for the pagination loop
    pub fn to_pagination_config(&self) -> PaginationConfig {
        let mut config = match self.pagination.max_pages {
            Some(limit) => PaginationConfig::new().with_max_pages(limit),
            None => PaginationConfig::new().unbounded(),
        };
        if let Some(seconds) = self.pagination.timeout_seconds {
            config = config.with_timeout(Duration::from_secs(seconds));
        }
        config
    }
}
