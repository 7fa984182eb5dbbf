//! Trigger decision and emission.
//!
//! [`decide`] is a pure function of the rule and the correlation: every
//! source must be present and in its expected state, checked in rule order,
//! stopping at the first failure. [`trigger`] then writes one breaching
//! datum per correlated target. Targets are written concurrently and each
//! outcome is reported separately; a failed write never stops the others.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::MonitoringBackend;
use crate::correlator::CorrelationResult;
use crate::rule::AggregationRule;
use crate::types::{AlarmSnapshot, AlarmState, MetricDatum};

/// Why the targets were not triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoldReason {
    /// A source alarm was not found in the backend.
    Missing {
        /// Configured identifier.
        alarm: String,
    },
    /// A source alarm is not in its expected state.
    Mismatch {
        /// Configured identifier.
        alarm: String,
        /// Required state.
        expected: AlarmState,
        /// Actual state.
        actual: AlarmState,
    },
}

impl std::fmt::Display for HoldReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { alarm } => write!(f, "{alarm} was not found in the backend"),
            Self::Mismatch {
                alarm,
                expected,
                actual,
            } => write!(f, "{alarm} is in {actual} state but expected to be in {expected}"),
        }
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<'a> {
    /// Every source matched. Holds the correlated targets in rule order.
    Trigger(Vec<TriggerTarget<'a>>),
    /// A source did not match.
    Hold(HoldReason),
}

impl Decision<'_> {
    /// Returns true if targets should be triggered.
    #[must_use]
    pub const fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger(_))
    }
}

/// A correlated target: the configured identifier and the backend alarm
/// it resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerTarget<'a> {
    /// Identifier from the rule.
    pub identifier: &'a str,
    /// Live snapshot of the matched alarm.
    pub snapshot: &'a AlarmSnapshot,
}

impl<'a> TriggerTarget<'a> {
    /// Pairs an identifier with its snapshot.
    #[must_use]
    pub const fn new(identifier: &'a str, snapshot: &'a AlarmSnapshot) -> Self {
        Self {
            identifier,
            snapshot,
        }
    }
}

/// Result of one attempted emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionOutcome {
    /// Configured target identifier.
    pub target: String,
    /// Backend alarm name of the target.
    pub alarm: String,
    /// Whether the datum was written.
    pub success: bool,
    /// Error description on failure.
    pub error: Option<String>,
}

impl EmissionOutcome {
    fn success(target: &TriggerTarget<'_>) -> Self {
        Self {
            target: target.identifier.to_string(),
            alarm: target.snapshot.name.clone(),
            success: true,
            error: None,
        }
    }

    fn failure(target: &TriggerTarget<'_>, error: impl Into<String>) -> Self {
        Self {
            target: target.identifier.to_string(),
            alarm: target.snapshot.name.clone(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Decides whether the rule's targets should be triggered.
#[must_use]
pub fn decide<'a>(rule: &AggregationRule, correlation: &'a CorrelationResult) -> Decision<'a> {
    for source in rule.sources() {
        let Some(snapshot) = correlation.source(&source.alarm) else {
            return Decision::Hold(HoldReason::Missing {
                alarm: source.alarm.clone(),
            });
        };
        if snapshot.state != source.expected {
            return Decision::Hold(HoldReason::Mismatch {
                alarm: source.alarm.clone(),
                expected: source.expected,
                actual: snapshot.state,
            });
        }
    }

    let targets = rule
        .targets()
        .iter()
        .filter_map(|t| correlation.targets.get_key_value(t.as_str()))
        .map(|(identifier, snapshot)| TriggerTarget::new(identifier, snapshot))
        .collect();
    Decision::Trigger(targets)
}

/// Writes one breaching datum for each target.
///
/// Outcomes are returned in the order of `targets`.
pub async fn trigger<B: MonitoringBackend>(
    backend: &B,
    targets: &[TriggerTarget<'_>],
) -> Vec<EmissionOutcome> {
    join_all(targets.iter().map(|target| emit(backend, target))).await
}

async fn emit<B: MonitoringBackend>(backend: &B, target: &TriggerTarget<'_>) -> EmissionOutcome {
    let alarm = &target.snapshot.name;
    let Some(stream) = &target.snapshot.metric else {
        warn!(%alarm, identifier = target.identifier, "target alarm has no single metric, cannot trigger");
        return EmissionOutcome::failure(target, "alarm has no single metric to breach");
    };

    info!(
        %alarm,
        identifier = target.identifier,
        namespace = %stream.namespace,
        metric = %stream.metric_name,
        "triggering alarm by sending breaching metric data"
    );
    let datum = MetricDatum::breaching(stream, Utc::now());
    match backend.put_metric_data(&stream.namespace, datum).await {
        Ok(()) => EmissionOutcome::success(target),
        Err(e) => {
            warn!(%alarm, error = %e, "metric emission failed");
            EmissionOutcome::failure(target, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FakeMonitoringBackend;
    use crate::correlator::correlate_snapshots;
    use crate::types::{BREACH_VALUE, MetricStream};
    use proptest::prelude::*;

    fn stream(metric: &str) -> MetricStream {
        MetricStream::new("App/Aggregate", metric).with_dimension("Stack", "prod")
    }

    fn rule_ab_c() -> AggregationRule {
        AggregationRule::builder()
            .source("A", AlarmState::Alarm)
            .source("B", AlarmState::Ok)
            .target("C")
            .build()
            .unwrap()
    }

    fn correlation(a: AlarmState, b: AlarmState) -> CorrelationResult {
        correlate_snapshots(
            &rule_ab_c(),
            &[
                AlarmSnapshot::new("A", a),
                AlarmSnapshot::new("B", b),
                AlarmSnapshot::new("C", AlarmState::Ok).with_metric(stream("Trigger")),
            ],
        )
    }

    mod decide_tests {
        use super::*;

        #[test]
        fn all_sources_match() {
            let corr = correlation(AlarmState::Alarm, AlarmState::Ok);
            let Decision::Trigger(targets) = decide(&rule_ab_c(), &corr) else {
                panic!("expected trigger");
            };
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].identifier, "C");
            assert_eq!(targets[0].snapshot.name, "C");
        }

        #[test]
        fn halts_at_first_mismatch() {
            let corr = correlation(AlarmState::Alarm, AlarmState::Alarm);
            assert_eq!(
                decide(&rule_ab_c(), &corr),
                Decision::Hold(HoldReason::Mismatch {
                    alarm: "B".to_string(),
                    expected: AlarmState::Ok,
                    actual: AlarmState::Alarm,
                })
            );
        }

        #[test]
        fn reports_mismatch_in_rule_order() {
            let corr = correlation(AlarmState::Ok, AlarmState::Alarm);
            let Decision::Hold(HoldReason::Mismatch { alarm, .. }) = decide(&rule_ab_c(), &corr)
            else {
                panic!("expected mismatch");
            };
            assert_eq!(alarm, "A");
        }

        #[test]
        fn missing_source_fails_closed() {
            let corr = correlate_snapshots(
                &rule_ab_c(),
                &[
                    AlarmSnapshot::new("A", AlarmState::Alarm),
                    AlarmSnapshot::new("C", AlarmState::Ok).with_metric(stream("Trigger")),
                ],
            );
            assert_eq!(
                decide(&rule_ab_c(), &corr),
                Decision::Hold(HoldReason::Missing {
                    alarm: "B".to_string()
                })
            );
        }

        #[test]
        fn missing_target_is_skipped() {
            let rule = AggregationRule::builder()
                .source("A", AlarmState::Alarm)
                .targets(["C", "D"])
                .build()
                .unwrap();
            let corr = correlate_snapshots(
                &rule,
                &[
                    AlarmSnapshot::new("A", AlarmState::Alarm),
                    AlarmSnapshot::new("D", AlarmState::Ok),
                ],
            );
            let Decision::Trigger(targets) = decide(&rule, &corr) else {
                panic!("expected trigger");
            };
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].identifier, "D");
            assert_eq!(targets[0].snapshot.name, "D");
        }

        #[test]
        fn hold_reason_display() {
            let reason = HoldReason::Mismatch {
                alarm: "B".to_string(),
                expected: AlarmState::Ok,
                actual: AlarmState::Alarm,
            };
            assert_eq!(
                reason.to_string(),
                "B is in ALARM state but expected to be in OK"
            );
        }
    }

    mod trigger_tests {
        use super::*;

        #[tokio::test]
        async fn emits_one_breaching_datum_per_target() {
            let backend = FakeMonitoringBackend::new();
            let c = AlarmSnapshot::new("C", AlarmState::Ok).with_metric(stream("TriggerC"));
            let d = AlarmSnapshot::new("D", AlarmState::Ok).with_metric(stream("TriggerD"));

            let outcomes =
                trigger(&backend, &[TriggerTarget::new("C", &c), TriggerTarget::new("D", &d)]).await;

            assert!(outcomes.iter().all(|o| o.success));
            let puts = backend.puts();
            assert_eq!(puts.len(), 2);
            for put in &puts {
                assert_eq!(put.namespace, "App/Aggregate");
                assert!((put.datum.value - BREACH_VALUE).abs() < f64::EPSILON);
                assert_eq!(put.datum.dimensions, stream("x").dimensions);
            }
        }

        #[tokio::test]
        async fn failure_does_not_stop_other_targets() {
            let backend = FakeMonitoringBackend::new();
            backend.fail_metric("TriggerC");
            let c = AlarmSnapshot::new("C", AlarmState::Ok).with_metric(stream("TriggerC"));
            let d = AlarmSnapshot::new("D", AlarmState::Ok).with_metric(stream("TriggerD"));

            let outcomes =
                trigger(&backend, &[TriggerTarget::new("C", &c), TriggerTarget::new("D", &d)]).await;

            assert_eq!(outcomes.len(), 2);
            assert!(!outcomes[0].success);
            assert!(outcomes[0].error.is_some());
            assert!(outcomes[1].success);
            assert_eq!(backend.puts().len(), 1);
        }

        #[tokio::test]
        async fn target_without_metric_fails_without_backend_call() {
            let backend = FakeMonitoringBackend::new();
            let expr = AlarmSnapshot::new("Expr", AlarmState::Ok);

            let outcomes = trigger(&backend, &[TriggerTarget::new("Expr", &expr)]).await;

            assert_eq!(outcomes.len(), 1);
            assert!(!outcomes[0].success);
            assert_eq!(backend.call_count(), 0);
        }

        #[tokio::test]
        async fn outcome_carries_identifier_and_backend_name() {
            let backend = FakeMonitoringBackend::new();
            let agg = AlarmSnapshot::new("prod-web-aggregate", AlarmState::Ok)
                .with_metric(stream("Aggregate"));

            let outcomes = trigger(&backend, &[TriggerTarget::new("web-aggregate", &agg)]).await;

            assert_eq!(
                outcomes,
                vec![EmissionOutcome {
                    target: "web-aggregate".to_string(),
                    alarm: "prod-web-aggregate".to_string(),
                    success: true,
                    error: None,
                }]
            );
        }

        #[tokio::test]
        async fn no_targets_no_calls() {
            let backend = FakeMonitoringBackend::new();
            assert!(trigger(&backend, &[]).await.is_empty());
            assert_eq!(backend.call_count(), 0);
        }
    }

    fn state() -> impl Strategy<Value = AlarmState> {
        prop_oneof![
            Just(AlarmState::Ok),
            Just(AlarmState::Alarm),
            Just(AlarmState::InsufficientData),
        ]
    }

    proptest! {
        #[test]
        fn decision_is_pure(a in state(), b in state()) {
            let rule = rule_ab_c();
            let corr = correlation(a, b);
            prop_assert_eq!(decide(&rule, &corr), decide(&rule, &corr));
        }

        #[test]
        fn triggers_only_when_every_source_matches(a in state(), b in state()) {
            let corr = correlation(a, b);
            let expected = a == AlarmState::Alarm && b == AlarmState::Ok;
            prop_assert_eq!(decide(&rule_ab_c(), &corr).is_trigger(), expected);
        }

        #[test]
        fn absent_source_never_triggers(b in state()) {
            let corr = correlate_snapshots(&rule_ab_c(), &[AlarmSnapshot::new("B", b)]);
            prop_assert!(!decide(&rule_ab_c(), &corr).is_trigger());
        }
    }
}
