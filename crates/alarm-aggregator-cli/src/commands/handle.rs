//! Notification handling command.

use std::io::{Read, Write};

use alarm_aggregator::{AlarmAggregator, MonitoringBackend};
use tracing::debug;

use crate::cli::HandleArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Runs one invocation of the aggregator against a notification document.
pub struct HandleCommand<B> {
    aggregator: AlarmAggregator<B>,
}

impl<B: MonitoringBackend> HandleCommand<B> {
    /// Create a new handle command.
    #[must_use]
    pub const fn new(aggregator: AlarmAggregator<B>) -> Self {
        Self { aggregator }
    }

    /// Execute the handle command.
    ///
    /// Failed emissions are part of the printed outcome and do not fail
    /// the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be read or is malformed, if
    /// the describe query fails, or if output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &HandleArgs,
    ) -> Result<(), CliError> {
        let raw = read_event(&args.event)?;
        let outcome = self.aggregator.handle_notification(&raw).await?;
        format.write(writer, &outcome)
    }
}

/// Reads the event document from a path, or stdin for `-`.
fn read_event(source: &str) -> Result<String, CliError> {
    if source == "-" {
        debug!("reading notification from stdin");
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        return Ok(raw);
    }
    debug!(path = source, "reading notification");
    std::fs::read_to_string(source)
        .map_err(|e| CliError::Config(format!("cannot read event {source}: {e}")))
}
