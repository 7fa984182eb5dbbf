//! Rule validation command.

use std::io::Write;

use alarm_aggregator::AggregationRule;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Prints a resolved rule. Resolution has already validated it.
pub struct ValidateCommand<'a> {
    rule: &'a AggregationRule,
}

impl<'a> ValidateCommand<'a> {
    /// Create a new validate command.
    #[must_use]
    pub const fn new(rule: &'a AggregationRule) -> Self {
        Self { rule }
    }

    /// Execute the validate command.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        format.write(writer, self.rule)
    }
}
