//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use alarm_aggregator::{AggregationRule, AlarmSnapshot, InvocationOutcome, Preview};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for AggregationRule {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Aggregation Rule")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Match policy:  {}", self.match_policy())?;
        writeln!(writer)?;
        writeln!(writer, "{:<40} EXPECTED", "SOURCE")?;
        writeln!(writer, "{}", "─".repeat(58))?;
        for source in self.sources() {
            writeln!(writer, "{:<40} {}", source.alarm, source.expected)?;
        }
        writeln!(writer)?;
        writeln!(writer, "TARGET")?;
        writeln!(writer, "{}", "─".repeat(58))?;
        for target in self.targets() {
            writeln!(writer, "{target}")?;
        }
        Ok(())
    }
}

impl TableDisplay for InvocationOutcome {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self {
            Self::Ignored { alarm, state } => {
                writeln!(writer, "Outcome: ignored")?;
                writeln!(writer, "  {alarm} moved to {state}, only ALARM transitions are acted on")?;
            }
            Self::Held { reason } => {
                writeln!(writer, "Outcome: held")?;
                writeln!(writer, "  {reason}")?;
            }
            Self::Triggered { emissions } => {
                writeln!(writer, "Outcome: triggered")?;
                writeln!(writer)?;
                writeln!(writer, "{:<30} {:<40} {:<8} ERROR", "TARGET", "ALARM", "RESULT")?;
                writeln!(writer, "{}", "─".repeat(100))?;
                for emission in emissions {
                    let result = if emission.success { "ok" } else { "failed" };
                    writeln!(
                        writer,
                        "{:<30} {:<40} {:<8} {}",
                        emission.target,
                        emission.alarm,
                        result,
                        emission.error.as_deref().unwrap_or("-")
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn write_snapshot_row<W: Write>(
    writer: &mut W,
    role: &str,
    identifier: &str,
    snapshot: Option<&AlarmSnapshot>,
) -> Result<(), CliError> {
    match snapshot {
        Some(s) => writeln!(writer, "{role:<8} {identifier:<30} {:<40} {}", s.name, s.state)?,
        None => writeln!(writer, "{role:<8} {identifier:<30} {:<40} -", "(not found)")?,
    }
    Ok(())
}

/// A preview paired with the rule it was computed for, so rows can be
/// listed in rule order.
#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    /// The rule checked.
    pub rule: &'a AggregationRule,
    /// What would happen on the next ALARM notification.
    #[serde(flatten)]
    pub preview: Preview,
}

impl TableDisplay for CheckReport<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{:<8} {:<30} {:<40} STATE",
            "ROLE", "IDENTIFIER", "ALARM"
        )?;
        writeln!(writer, "{}", "─".repeat(90))?;
        for source in self.rule.sources() {
            write_snapshot_row(
                writer,
                "source",
                &source.alarm,
                self.preview.correlation.source(&source.alarm),
            )?;
        }
        for target in self.rule.targets() {
            write_snapshot_row(
                writer,
                "target",
                target,
                self.preview.correlation.target(target),
            )?;
        }
        writeln!(writer)?;
        match &self.preview.hold {
            Some(reason) => writeln!(writer, "Would hold: {reason}")?,
            None => {
                let names: Vec<&str> = self
                    .preview
                    .would_trigger
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect();
                writeln!(writer, "Would trigger: {}", names.join(", "))?;
            }
        }
        Ok(())
    }
}
