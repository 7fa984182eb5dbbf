//! Command-line argument parsing with clap.

use std::path::PathBuf;

use alarm_aggregator::{AggregationRule, MatchPolicy, SourceExpectation};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::CliError;

/// Alarm aggregator - drive aggregate alarms from the state of source alarms.
#[derive(Parser, Debug, Clone)]
#[command(name = "alarm-aggregator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Log format written to stderr.
    #[arg(long, value_enum, env = "AGGREGATOR_LOG_FORMAT", default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// AWS region for the CloudWatch client. Defaults to the SDK's region chain.
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Aggregation rule configuration.
    #[command(flatten)]
    pub rule: RuleArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Name matching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Backend name contains the configured identifier.
    Contains,
    /// Backend name equals the configured identifier.
    Exact,
}

impl From<Policy> for MatchPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Contains => Self::Contains,
            Policy::Exact => Self::Exact,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Process one delivered alarm notification.
    Handle(HandleArgs),

    /// Correlate and decide against live alarm state without emitting
    /// anything.
    Check,

    /// Resolve the configured rule, print it, and exit.
    Validate,
}

/// Arguments for the handle command.
#[derive(Args, Debug, Clone)]
pub struct HandleArgs {
    /// Notification document to process, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub event: String,
}

/// Where the aggregation rule comes from.
///
/// Exactly one of three forms must be used: a JSON rule file, explicit
/// `--source`/`--target` lists, or the three named web-tier alarms.
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// JSON rule document.
    #[arg(long, env = "AGGREGATOR_RULE_FILE")]
    pub rule_file: Option<PathBuf>,

    /// Source alarm and its expected state (NAME=STATE). Repeatable.
    #[arg(long = "source", value_name = "NAME=STATE", env = "AGGREGATOR_SOURCES", value_delimiter = ',')]
    pub sources: Vec<SourceExpectation>,

    /// Target alarm to trigger. Repeatable.
    #[arg(long = "target", value_name = "NAME", env = "AGGREGATOR_TARGETS", value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Apache busy-worker alarm, expected in ALARM.
    #[arg(long, env = "APACHE_BUSY_ALARM_NAME")]
    pub apache_busy_alarm: Option<String>,

    /// Database blocked-connection alarm, expected OK.
    #[arg(long, env = "DB_BLOCKED_CONN_ALARM_NAME")]
    pub db_blocked_conn_alarm: Option<String>,

    /// Aggregator alarm driven by the web-tier rule.
    ///
    /// Earlier deployments set this as `AGGREGATOR_ALAM_NAME`; that spelling
    /// is not read, so rename the variable when upgrading.
    #[arg(long, env = "AGGREGATOR_ALARM_NAME")]
    pub aggregator_alarm: Option<String>,

    /// How identifiers are matched against backend alarm names.
    #[arg(long, value_enum, env = "AGGREGATOR_MATCH_POLICY")]
    pub match_policy: Option<Policy>,
}

impl RuleArgs {
    fn uses_lists(&self) -> bool {
        !self.sources.is_empty() || !self.targets.is_empty()
    }

    fn uses_named_alarms(&self) -> bool {
        self.apache_busy_alarm.is_some()
            || self.db_blocked_conn_alarm.is_some()
            || self.aggregator_alarm.is_some()
    }

    /// Resolves the arguments into a validated rule.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if no rule is configured, if more than
    /// one form is used, or if the web-tier form is incomplete, and
    /// `CliError::Aggregator` if the rule fails validation.
    pub fn resolve(&self) -> Result<AggregationRule, CliError> {
        if let Some(path) = &self.rule_file {
            if self.uses_lists() || self.uses_named_alarms() || self.match_policy.is_some() {
                return Err(CliError::Config(
                    "--rule-file cannot be combined with other rule options".to_string(),
                ));
            }
            let json = std::fs::read_to_string(path).map_err(|e| {
                CliError::Config(format!("cannot read rule file {}: {e}", path.display()))
            })?;
            return Ok(AggregationRule::from_json(&json)?);
        }

        let policy = self.match_policy.map(MatchPolicy::from).unwrap_or_default();

        if self.uses_lists() {
            if self.uses_named_alarms() {
                return Err(CliError::Config(
                    "--source/--target cannot be combined with the named web-tier alarms"
                        .to_string(),
                ));
            }
            return Ok(AggregationRule::builder()
                .sources(self.sources.iter().cloned())
                .targets(self.targets.iter().cloned())
                .match_policy(policy)
                .build()?);
        }

        match (
            &self.apache_busy_alarm,
            &self.db_blocked_conn_alarm,
            &self.aggregator_alarm,
        ) {
            (Some(apache), Some(db), Some(aggregate)) => {
                Ok(AggregationRule::apache_db(apache, db, aggregate)
                    .match_policy(policy)
                    .build()?)
            }
            (None, None, None) => Err(CliError::Config(
                "no aggregation rule configured: use --rule-file, --source/--target, or set \
                 APACHE_BUSY_ALARM_NAME, DB_BLOCKED_CONN_ALARM_NAME and AGGREGATOR_ALARM_NAME"
                    .to_string(),
            )),
            (apache, db, aggregate) => {
                let missing: Vec<&str> = [
                    (apache.is_none(), "APACHE_BUSY_ALARM_NAME"),
                    (db.is_none(), "DB_BLOCKED_CONN_ALARM_NAME"),
                    (
                        aggregate.is_none(),
                        "AGGREGATOR_ALARM_NAME (formerly AGGREGATOR_ALAM_NAME)",
                    ),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(CliError::Config(format!(
                    "incomplete web-tier rule, missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}
