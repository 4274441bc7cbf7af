//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Retrieve complete result sets from a paginated query API
#[derive(Parser, Debug)]
#[command(name = "paged-query")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query and write every record it matches
    Query {
        /// Query text (SOQL)
        soql: String,

        /// Retry preset (overrides the config file)
        #[arg(long)]
        preset: Option<String>,

        /// Total attempts per call
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Delay between attempts in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Maximum pages to fetch
        #[arg(long)]
        max_pages: Option<usize>,

        /// Overall time budget in seconds
        #[arg(long)]
        timeout_seconds: Option<u64>,

        /// Write records to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Validate the configuration file and print the effective settings
    Validate,

    /// List the built-in retry presets
    Presets,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One record per line
    Jsonl,
    /// Indented JSON array
    Pretty,
}
