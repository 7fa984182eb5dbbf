//! Error types for the alarm-aggregator crate.

use thiserror::Error;

/// Errors that can end an aggregation invocation.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The delivered notification could not be parsed.
    #[error("malformed event: {reason}")]
    MalformedEvent {
        /// What was wrong with the payload.
        reason: String,
    },

    /// The delivered notification carried no records.
    #[error("notification contains no records")]
    EmptyBatch,

    /// The aggregation rule is misconfigured.
    #[error("invalid rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// The describe-alarms query failed.
    #[error("backend query failed: {reason}")]
    BackendQuery {
        /// The backend's error description.
        reason: String,
    },

    /// A put-metric-data call failed.
    #[error("metric emission failed for {metric}: {reason}")]
    MetricEmission {
        /// Metric name the datum was addressed to.
        metric: String,
        /// The backend's error description.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AggregatorError {
    /// Shorthand for [`AggregatorError::InvalidRule`].
    pub(crate) fn invalid_rule(reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            reason: reason.into(),
        }
    }

    /// Returns true if the error stems from the inbound event rather than
    /// configuration or the backend.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::MalformedEvent { .. } | Self::EmptyBatch)
    }
}

impl From<serde_json::Error> for AggregatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for aggregator operations.
pub type Result<T> = std::result::Result<T, AggregatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_malformed_event() {
        let err = AggregatorError::MalformedEvent {
            reason: "missing AlarmName".to_string(),
        };
        assert_eq!(err.to_string(), "malformed event: missing AlarmName");
    }

    #[test]
    fn error_display_empty_batch() {
        assert_eq!(
            AggregatorError::EmptyBatch.to_string(),
            "notification contains no records"
        );
    }

    #[test]
    fn error_display_backend_query() {
        let err = AggregatorError::BackendQuery {
            reason: "throttled".to_string(),
        };
        assert_eq!(err.to_string(), "backend query failed: throttled");
    }

    #[test]
    fn error_display_metric_emission() {
        let err = AggregatorError::MetricEmission {
            metric: "BusyWorkers".to_string(),
            reason: "access denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "metric emission failed for BusyWorkers: access denied"
        );
    }

    #[test]
    fn error_invalid_rule_helper() {
        let err = AggregatorError::invalid_rule("no targets");
        assert_eq!(err.to_string(), "invalid rule: no targets");
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(AggregatorError::EmptyBatch.is_input_error());
        assert!(!AggregatorError::invalid_rule("x").is_input_error());
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let err: AggregatorError = json_err.unwrap_err().into();
        assert!(matches!(err, AggregatorError::Serialization(_)));
    }
}
