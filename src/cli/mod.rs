//! CLI module
//!
//! Command-line interface for running retrievals.
//!
//! # Commands
//!
//! - `query` - Retrieve every record a query matches
//! - `validate` - Check the configuration file
//! - `presets` - List the retry presets

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{write_records, Overrides, Runner};
