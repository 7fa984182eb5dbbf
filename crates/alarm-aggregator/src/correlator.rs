//! State correlation: joins the rule's alarm identifiers with live backend
//! alarms.
//!
//! One describe query is issued for every alarm the rule references. Each
//! configured identifier is then matched against the returned names using
//! the rule's [`MatchPolicy`](crate::rule::MatchPolicy). When several
//! backend alarms match the same identifier, the last one returned wins.
//! Identifiers with no match are left out of the result.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, error};

use crate::backend::MonitoringBackend;
use crate::error::Result;
use crate::rule::AggregationRule;
use crate::types::AlarmSnapshot;

/// Live snapshots keyed by configured identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationResult {
    /// Source identifier to snapshot.
    pub sources: HashMap<String, AlarmSnapshot>,
    /// Target identifier to snapshot.
    pub targets: HashMap<String, AlarmSnapshot>,
}

impl CorrelationResult {
    /// Snapshot correlated with a source identifier.
    #[must_use]
    pub fn source(&self, identifier: &str) -> Option<&AlarmSnapshot> {
        self.sources.get(identifier)
    }

    /// Snapshot correlated with a target identifier.
    #[must_use]
    pub fn target(&self, identifier: &str) -> Option<&AlarmSnapshot> {
        self.targets.get(identifier)
    }
}

/// Queries the backend and correlates the result with `rule`.
///
/// # Errors
///
/// Returns the backend's error if the describe query fails. Nothing is
/// correlated in that case.
pub async fn correlate<B: MonitoringBackend>(
    backend: &B,
    rule: &AggregationRule,
) -> Result<CorrelationResult> {
    let names = rule.alarm_names();
    debug!(alarms = ?names, "describing alarms");

    let snapshots = backend.describe_alarms(&names).await.inspect_err(|e| {
        error!(error = %e, "describe alarms failed");
    })?;

    Ok(correlate_snapshots(rule, &snapshots))
}

/// Correlates already fetched snapshots with `rule`.
#[must_use]
pub fn correlate_snapshots(rule: &AggregationRule, snapshots: &[AlarmSnapshot]) -> CorrelationResult {
    let policy = rule.match_policy();
    let mut result = CorrelationResult::default();

    for source in rule.sources() {
        for snapshot in snapshots {
            if policy.matches(&snapshot.name, &source.alarm) {
                debug!(identifier = %source.alarm, alarm = %snapshot.name, "matched source alarm");
                result.sources.insert(source.alarm.clone(), snapshot.clone());
            }
        }
    }

    for target in rule.targets() {
        for snapshot in snapshots {
            if policy.matches(&snapshot.name, target) {
                debug!(identifier = %target, alarm = %snapshot.name, "matched target alarm");
                result.targets.insert(target.clone(), snapshot.clone());
            }
        }
    }

    debug!(
        sources = result.sources.len(),
        targets = result.targets.len(),
        returned = snapshots.len(),
        "correlation complete"
    );
    result
}
