//! Dry-run command: show what the next ALARM notification would do.

use std::io::Write;

use alarm_aggregator::{AlarmAggregator, MonitoringBackend};

use crate::error::CliError;
use crate::output::{CheckReport, OutputFormat};

/// Correlates and decides against live state without emitting.
pub struct CheckCommand<B> {
    aggregator: AlarmAggregator<B>,
}

impl<B: MonitoringBackend> CheckCommand<B> {
    /// Create a new check command.
    #[must_use]
    pub const fn new(aggregator: AlarmAggregator<B>) -> Self {
        Self { aggregator }
    }

    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if the describe query fails or output fails.
    pub async fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let preview = self.aggregator.preview().await?;
        let report = CheckReport {
            rule: self.aggregator.rule(),
            preview,
        };
        format.write(writer, &report)
    }
}
