//! Event intake: unwraps the notification envelope.
//!
//! Alarm state changes are delivered as SNS notifications whose `Message`
//! field holds the state change serialized as a JSON string:
//!
//! ```json
//! {"Records":[{"Sns":{"Message":"{\"AlarmName\":\"...\",\"NewStateValue\":\"ALARM\"}"}}]}
//! ```
//!
//! Only the first record of a delivery is read. Upstream delivers one
//! record per invocation; extra records are dropped with a debug log.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AggregatorError, Result};
use crate::types::AlarmState;

#[derive(Debug, Deserialize)]
struct Notification {
    // Only the first record is decoded; the rest may have any shape.
    #[serde(rename = "Records")]
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "Sns")]
    sns: SnsPayload,
}

#[derive(Debug, Deserialize)]
struct SnsPayload {
    #[serde(rename = "Message")]
    message: String,
}

/// An alarm state transition, as published by the monitoring backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlarmStateChange {
    /// Name of the alarm that changed state.
    pub alarm_name: String,
    /// State the alarm moved into.
    pub new_state_value: AlarmState,
    /// State the alarm left.
    #[serde(default)]
    pub old_state_value: Option<AlarmState>,
    /// Human-readable reason for the transition.
    #[serde(default)]
    pub new_state_reason: Option<String>,
    /// Transition time, verbatim from the backend.
    #[serde(default)]
    pub state_change_time: Option<String>,
    /// Alarm description.
    #[serde(default)]
    pub alarm_description: Option<String>,
    /// Region the alarm lives in.
    #[serde(default)]
    pub region: Option<String>,
    /// Owning account.
    #[serde(default, rename = "AWSAccountId")]
    pub account_id: Option<String>,
}

impl AlarmStateChange {
    /// Creates a state change with only the required fields set.
    #[must_use]
    pub fn new(alarm_name: impl Into<String>, new_state: AlarmState) -> Self {
        Self {
            alarm_name: alarm_name.into(),
            new_state_value: new_state,
            old_state_value: None,
            new_state_reason: None,
            state_change_time: None,
            alarm_description: None,
            region: None,
            account_id: None,
        }
    }

    /// Sets the previous state.
    #[must_use]
    pub const fn with_old_state(mut self, state: AlarmState) -> Self {
        self.old_state_value = Some(state);
        self
    }

    /// Returns true if this is a transition into ALARM, the only kind
    /// that is acted on.
    #[must_use]
    pub fn is_alarm(&self) -> bool {
        self.new_state_value == AlarmState::Alarm
    }
}

/// Parses a delivered notification and returns the state change carried
/// by its first record.
///
/// # Errors
///
/// Returns [`AggregatorError::EmptyBatch`] if there are no records and
/// [`AggregatorError::MalformedEvent`] if the envelope or the embedded
/// message does not have the expected shape.
pub fn parse_notification(raw: &str) -> Result<AlarmStateChange> {
    let notification: Notification =
        serde_json::from_str(raw).map_err(|e| AggregatorError::MalformedEvent {
            reason: format!("envelope: {e}"),
        })?;

    let total = notification.records.len();
    let first = notification
        .records
        .into_iter()
        .next()
        .ok_or(AggregatorError::EmptyBatch)?;
    if total > 1 {
        debug!(dropped = total - 1, "ignoring extra records in delivery");
    }

    let record: Record =
        serde_json::from_value(first).map_err(|e| AggregatorError::MalformedEvent {
            reason: format!("envelope: {e}"),
        })?;
    parse_message(&record.sns.message)
}

/// Parses the embedded state-change message on its own.
///
/// # Errors
///
/// Returns [`AggregatorError::MalformedEvent`] if the message is not a
/// valid state change.
pub fn parse_message(message: &str) -> Result<AlarmStateChange> {
    serde_json::from_str(message).map_err(|e| AggregatorError::MalformedEvent {
        reason: format!("message: {e}"),
    })
}
