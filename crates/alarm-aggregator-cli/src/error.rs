//! CLI error types.

use alarm_aggregator::AggregatorError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// The aggregator failed.
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
