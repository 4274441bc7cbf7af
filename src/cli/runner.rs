//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{self, AppConfig};
use crate::error::{Error, Result};
use crate::pagination::{PaginationConfig, PaginationLoop};
use crate::retry::RetryConfig;
use crate::service::RestQueryService;
use crate::types::{Query, Record};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-run settings given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Retry preset replacing the configured one
    pub preset: Option<String>,
    /// Attempt budget per call
    pub max_attempts: Option<u32>,
    /// Delay between attempts
    pub delay_ms: Option<u64>,
    /// Page cap
    pub max_pages: Option<usize>,
    /// Overall time budget
    pub timeout_seconds: Option<u64>,
}

impl Overrides {
    /// Apply to the configured retry settings
    pub fn retry(&self, configured: RetryConfig) -> Result<RetryConfig> {
        let mut retry = match self.preset {
            Some(ref name) => RetryConfig::preset(name).ok_or_else(|| {
                Error::invalid_value(
                    "--preset",
                    format!(
                        "unknown preset '{name}', expected one of: {}",
                        RetryConfig::preset_names().join(", ")
                    ),
                )
            })?,
            None => configured,
        };

        if let Some(attempts) = self.max_attempts {
            if attempts == 0 {
                return Err(Error::invalid_value("--max-attempts", "must be at least 1"));
            }
            retry = retry.with_max_attempts(attempts);
        }
        if let Some(delay) = self.delay_ms {
            retry = retry.with_delay(Duration::from_millis(delay));
        }

        Ok(retry)
    }

    /// Apply to the configured pagination limits
    pub fn pagination(&self, configured: PaginationConfig) -> Result<PaginationConfig> {
        let mut pagination = configured;

        if let Some(limit) = self.max_pages {
            if limit == 0 {
                return Err(Error::invalid_value("--max-pages", "must be at least 1"));
            }
            pagination = pagination.with_max_pages(limit);
        }
        if let Some(seconds) = self.timeout_seconds {
            pagination = pagination.with_timeout(Duration::from_secs(seconds));
        }

        Ok(pagination)
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Query {
                soql,
                preset,
                max_attempts,
                delay_ms,
                max_pages,
                timeout_seconds,
                output,
                format,
            } => {
                let overrides = Overrides {
                    preset: preset.clone(),
                    max_attempts: *max_attempts,
                    delay_ms: *delay_ms,
                    max_pages: *max_pages,
                    timeout_seconds: *timeout_seconds,
                };
                self.query(soql, &overrides, output.as_deref(), *format)
                    .await
            }
            Commands::Validate => self.validate(),
            Commands::Presets => self.presets(),
        }
    }

    /// Load configuration
    fn load_config(&self) -> Result<AppConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::missing_field("--config"))?;
        config::load_config(path)
    }

    /// Run one retrieval and write its records
    async fn query(
        &self,
        soql: &str,
        overrides: &Overrides,
        output: Option<&Path>,
        format: OutputFormat,
    ) -> Result<()> {
        let config = self.load_config()?;
        let retry = overrides.retry(config.to_retry_config()?)?;
        let pagination = overrides.pagination(config.to_pagination_config())?;

        let service = RestQueryService::with_auth(config.to_rest_config(), config.auth.clone())?;
        let query = Query::new(soql.trim());
        if query.as_str().is_empty() {
            return Err(Error::invalid_value("query", "must not be empty"));
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling retrieval");
                    cancel.cancel();
                }
            })
        };

        let result = PaginationLoop::new(&service, retry)
            .with_config(pagination)
            .with_cancellation(cancel)
            .run(&query)
            .await;
        interrupt.abort();

        let results = result?;
        info!(
            "Retrieved {} records in {} page(s)",
            results.len(),
            results.pages()
        );

        match output {
            Some(path) => {
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                write_records(results.records(), format, &mut writer)?;
                writer.flush()?;
                info!("Wrote records to {}", path.display());
            }
            None => {
                let stdout = io::stdout();
                let mut writer = stdout.lock();
                write_records(results.records(), format, &mut writer)?;
                writer.flush()?;
            }
        }

        Ok(())
    }

    /// Validate configuration and print the effective settings
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let retry = config.to_retry_config()?;
        let pagination = config.to_pagination_config();
        let rest = config.to_rest_config();

        let summary = json!({
            "service": {
                "instance_url": rest.instance_url,
                "api_version": rest.api_version,
                "timeout_seconds": rest.timeout.as_secs(),
                "batch_size": rest.batch_size,
                "include_deleted": rest.include_deleted,
                "rate_limit": rest.rate_limit,
            },
            "auth": config.auth.kind(),
            "retry": retry_summary(&retry),
            "pagination": {
                "max_pages": pagination.max_pages,
                "timeout_seconds": pagination.timeout.map(|t| t.as_secs()),
            },
        });

        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        Ok(())
    }

    /// List retry presets
    fn presets(&self) -> Result<()> {
        let presets: Vec<_> = RetryConfig::preset_names()
            .iter()
            .filter_map(|name| {
                RetryConfig::preset(name).map(|retry| {
                    let mut summary = retry_summary(&retry);
                    summary["name"] = json!(name);
                    summary
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&presets).unwrap_or_default());
        Ok(())
    }
}

fn retry_summary(retry: &RetryConfig) -> serde_json::Value {
    json!({
        "max_attempts": retry.effective_attempts(),
        "delay_ms": retry.delay.as_millis() as u64,
        "backoff": retry.backoff,
        "max_delay_ms": retry.max_delay.as_millis() as u64,
        "retry_on": retry.retry_on,
    })
}

/// Serialize records in the requested format
pub fn write_records<W: Write>(records: &[Record], format: OutputFormat, writer: &mut W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, records)?;
            writeln!(writer)?;
        }
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut *writer, records)?;
            writeln!(writer)?;
        }
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut *writer, record)?;
                writeln!(writer)?;
            }
        }
    }
    Ok(())
}
