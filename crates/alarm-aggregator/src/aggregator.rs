//! Invocation handler wiring intake, correlation, and the decider.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::MonitoringBackend;
use crate::correlator::{CorrelationResult, correlate};
use crate::decider::{Decision, EmissionOutcome, HoldReason, decide, trigger};
use crate::error::Result;
use crate::intake::{AlarmStateChange, parse_notification};
use crate::rule::AggregationRule;
use crate::types::{AlarmSnapshot, AlarmState};

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The event was not a transition into ALARM. No backend calls were made.
    Ignored {
        /// Alarm named in the event.
        alarm: String,
        /// State it moved into.
        state: AlarmState,
    },
    /// A source alarm did not match; nothing was emitted.
    Held {
        /// The first failing source.
        reason: HoldReason,
    },
    /// Every source matched and the targets were triggered.
    Triggered {
        /// One entry per correlated target.
        emissions: Vec<EmissionOutcome>,
    },
}

impl InvocationOutcome {
    /// Number of successful emissions.
    #[must_use]
    pub fn emitted(&self) -> usize {
        match self {
            Self::Triggered { emissions } => emissions.iter().filter(|e| e.success).count(),
            _ => 0,
        }
    }
}

/// Result of a dry run: the correlation and the decision that would be
/// acted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    /// Correlated snapshots.
    pub correlation: CorrelationResult,
    /// Targets that would be triggered, empty when held.
    pub would_trigger: Vec<AlarmSnapshot>,
    /// Why nothing would be triggered.
    pub hold: Option<HoldReason>,
}

/// Applies one [`AggregationRule`] to delivered alarm notifications.
///
/// Holds no per-invocation state, so one aggregator can serve concurrent
/// invocations.
#[derive(Debug, Clone)]
pub struct AlarmAggregator<B> {
    rule: Arc<AggregationRule>,
    backend: B,
}

impl<B: MonitoringBackend> AlarmAggregator<B> {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(rule: impl Into<Arc<AggregationRule>>, backend: B) -> Self {
        Self {
            rule: rule.into(),
            backend,
        }
    }

    /// The rule applied.
    #[must_use]
    pub fn rule(&self) -> &AggregationRule {
        &self.rule
    }

    /// The backend in use.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Handles a raw notification document.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification is malformed or the describe
    /// query fails. Emission failures are reported in the outcome instead.
    pub async fn handle_notification(&self, raw: &str) -> Result<InvocationOutcome> {
        debug!(raw = %raw, "notification received");
        let change = parse_notification(raw).inspect_err(|e| {
            error!(error = %e, "rejecting malformed notification");
        })?;
        self.process(&change).await
    }

    /// Handles a parsed state change.
    ///
    /// # Errors
    ///
    /// Returns an error if the describe query fails.
    #[tracing::instrument(
        skip_all,
        fields(invocation_id = %uuid::Uuid::new_v4(), alarm = %change.alarm_name)
    )]
    pub async fn process(&self, change: &AlarmStateChange) -> Result<InvocationOutcome> {
        if !change.is_alarm() {
            info!(state = %change.new_state_value, "alarm did not enter ALARM, nothing to do");
            return Ok(InvocationOutcome::Ignored {
                alarm: change.alarm_name.clone(),
                state: change.new_state_value,
            });
        }

        info!("processing alarm");
        let correlation = correlate(&self.backend, &self.rule).await?;

        match decide(&self.rule, &correlation) {
            Decision::Hold(reason) => {
                warn!(%reason, "not triggering target alarms");
                Ok(InvocationOutcome::Held { reason })
            }
            Decision::Trigger(targets) => {
                info!(
                    targets = targets.len(),
                    "all source alarms in expected state, triggering target alarms"
                );
                let emissions = trigger(&self.backend, &targets).await;
                let failed = emissions.iter().filter(|e| !e.success).count();
                if failed > 0 {
                    warn!(failed, total = emissions.len(), "some target alarms were not triggered");
                }
                Ok(InvocationOutcome::Triggered { emissions })
            }
        }
    }

    /// Correlates and decides without emitting anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the describe query fails.
    pub async fn preview(&self) -> Result<Preview> {
        let correlation = correlate(&self.backend, &self.rule).await?;
        let (would_trigger, hold) = match decide(&self.rule, &correlation) {
            Decision::Trigger(targets) => (
                targets.into_iter().map(|t| t.snapshot.clone()).collect(),
                None,
            ),
            Decision::Hold(reason) => (Vec::new(), Some(reason)),
        };
        Ok(Preview {
            correlation,
            would_trigger,
            hold,
        })
    }
}
