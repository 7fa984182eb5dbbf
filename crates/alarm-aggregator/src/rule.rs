//! The aggregation rule: which alarms are checked, what state each is
//! expected to be in, and which aggregate alarms are driven on a match.
//!
//! A rule is built once at startup and never changes afterwards. All
//! validation happens in [`AggregationRuleBuilder::build`] so that a bad
//! configuration fails the process instead of silently never triggering.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AggregatorError, Result};
use crate::types::AlarmState;

/// How a configured identifier is matched against backend alarm names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// The backend name contains the identifier. Tolerates
    /// environment prefixes and suffixes around a stable name.
    #[default]
    Contains,
    /// The backend name equals the identifier.
    Exact,
}

impl MatchPolicy {
    /// Returns true if `backend_name` matches `identifier` under this policy.
    #[must_use]
    pub fn matches(&self, backend_name: &str, identifier: &str) -> bool {
        match self {
            Self::Contains => backend_name.contains(identifier),
            Self::Exact => backend_name == identifier,
        }
    }

    /// Returns the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source alarm and the state it must be in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExpectation {
    /// Alarm identifier.
    pub alarm: String,
    /// Required state.
    pub expected: AlarmState,
}

impl SourceExpectation {
    /// Creates a new expectation.
    #[must_use]
    pub fn new(alarm: impl Into<String>, expected: AlarmState) -> Self {
        Self {
            alarm: alarm.into(),
            expected,
        }
    }
}

impl FromStr for SourceExpectation {
    type Err = AggregatorError;

    /// Parses `NAME=STATE`, e.g. `apache-busy=ALARM`.
    fn from_str(s: &str) -> Result<Self> {
        let (alarm, state) = s.rsplit_once('=').ok_or_else(|| {
            AggregatorError::invalid_rule(format!("expected NAME=STATE, got '{s}'"))
        })?;
        Ok(Self::new(alarm.trim(), state.trim().parse()?))
    }
}

/// A validated aggregation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationRule {
    sources: Vec<SourceExpectation>,
    targets: Vec<String>,
    match_policy: MatchPolicy,
}

impl AggregationRule {
    /// Maximum number of distinct alarms one rule may reference. This is
    /// the name-filter limit of a single describe-alarms request.
    pub const MAX_ALARMS: usize = 100;

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> AggregationRuleBuilder {
        AggregationRuleBuilder::default()
    }

    /// Starts from the web-tier rule: the Apache busy-worker alarm must be
    /// in ALARM while the database blocked-connection alarm is OK, and the
    /// aggregator alarm is driven. A busy web tier with a healthy database
    /// points at the application itself.
    #[must_use]
    pub fn apache_db(
        apache_busy_alarm: impl Into<String>,
        db_blocked_conn_alarm: impl Into<String>,
        aggregator_alarm: impl Into<String>,
    ) -> AggregationRuleBuilder {
        Self::builder()
            .source(apache_busy_alarm, AlarmState::Alarm)
            .source(db_blocked_conn_alarm, AlarmState::Ok)
            .target(aggregator_alarm)
    }

    /// Parses and validates a JSON rule document.
    ///
    /// ```json
    /// {"sources":[{"alarm":"a","expected":"ALARM"}],"targets":["t"],"match_policy":"exact"}
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `AggregatorError::Serialization` for bad JSON and
    /// `AggregatorError::InvalidRule` if validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: RuleDocument = serde_json::from_str(json)?;
        Self::builder()
            .sources(doc.sources)
            .targets(doc.targets)
            .match_policy(doc.match_policy)
            .build()
    }

    /// Source expectations in evaluation order.
    #[must_use]
    pub fn sources(&self) -> &[SourceExpectation] {
        &self.sources
    }

    /// Target alarm identifiers.
    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// The name matching policy.
    #[must_use]
    pub const fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    /// Every alarm identifier the rule references, sources first, without
    /// duplicates. This is the describe-alarms filter.
    #[must_use]
    pub fn alarm_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .map(|s| &s.alarm)
            .chain(&self.targets)
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    sources: Vec<SourceExpectation>,
    targets: Vec<String>,
    #[serde(default)]
    match_policy: MatchPolicy,
}

/// Builder for [`AggregationRule`].
#[derive(Debug, Default)]
pub struct AggregationRuleBuilder {
    sources: Vec<SourceExpectation>,
    targets: Vec<String>,
    match_policy: MatchPolicy,
}

impl AggregationRuleBuilder {
    /// Adds a source expectation.
    #[must_use]
    pub fn source(mut self, alarm: impl Into<String>, expected: AlarmState) -> Self {
        self.sources.push(SourceExpectation::new(alarm, expected));
        self
    }

    /// Adds several source expectations.
    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = SourceExpectation>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Adds a target alarm.
    #[must_use]
    pub fn target(mut self, alarm: impl Into<String>) -> Self {
        self.targets.push(alarm.into());
        self
    }

    /// Adds several target alarms.
    #[must_use]
    pub fn targets<S: Into<String>>(mut self, targets: impl IntoIterator<Item = S>) -> Self {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Sets the name matching policy.
    #[must_use]
    pub const fn match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    /// Builds the [`AggregationRule`].
    ///
    /// # Errors
    ///
    /// Returns `AggregatorError::InvalidRule` if:
    /// - there are no sources or no targets
    /// - an identifier is empty or blank
    /// - a source or target is listed twice
    /// - the rule references more than [`AggregationRule::MAX_ALARMS`] alarms
    pub fn build(self) -> Result<AggregationRule> {
        if self.sources.is_empty() {
            return Err(AggregatorError::invalid_rule(
                "at least one source alarm is required",
            ));
        }
        if self.targets.is_empty() {
            return Err(AggregatorError::invalid_rule(
                "at least one target alarm is required",
            ));
        }

        let mut seen_sources = HashSet::new();
        for source in &self.sources {
            if source.alarm.trim().is_empty() {
                return Err(AggregatorError::invalid_rule(
                    "source alarm name cannot be empty",
                ));
            }
            if !seen_sources.insert(source.alarm.as_str()) {
                return Err(AggregatorError::invalid_rule(format!(
                    "source alarm '{}' is listed more than once",
                    source.alarm
                )));
            }
        }

        let mut seen_targets = HashSet::new();
        for target in &self.targets {
            if target.trim().is_empty() {
                return Err(AggregatorError::invalid_rule(
                    "target alarm name cannot be empty",
                ));
            }
            if !seen_targets.insert(target.as_str()) {
                return Err(AggregatorError::invalid_rule(format!(
                    "target alarm '{target}' is listed more than once"
                )));
            }
        }

        let rule = AggregationRule {
            sources: self.sources,
            targets: self.targets,
            match_policy: self.match_policy,
        };
        let referenced = rule.alarm_names().len();
        if referenced > AggregationRule::MAX_ALARMS {
            return Err(AggregatorError::invalid_rule(format!(
                "rule references {referenced} alarms, at most {} are allowed",
                AggregationRule::MAX_ALARMS
            )));
        }
        Ok(rule)
    }
}
