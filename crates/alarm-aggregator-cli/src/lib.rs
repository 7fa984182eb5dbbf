//! # alarm-aggregator-cli
//!
//! Command-line runner for the alarm aggregator.
//!
//! Provides commands for:
//! - Handling one delivered alarm notification
//! - Checking what the next notification would do
//! - Validating the configured rule
//!
//! The rule comes from a JSON file, from `--source`/`--target` lists, or
//! from the three web-tier alarm names, each settable through the
//! environment. Alarm state is read from and written to CloudWatch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, HandleArgs, LogFormat, RuleArgs};
pub use error::CliError;
pub use output::OutputFormat;
