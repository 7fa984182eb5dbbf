//! Core types shared by the intake, correlator, and decider.
//!
//! - [`AlarmState`]: the closed set of alarm states
//! - [`Dimension`] and [`MetricStream`]: the metric an alarm watches
//! - [`AlarmSnapshot`]: current backend state of one alarm
//! - [`MetricDatum`]: a data point sent to the backend

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AggregatorError;

/// Value of every synthetic data point. Aggregate alarms are configured so
/// that this value breaches their threshold.
pub const BREACH_VALUE: f64 = 1.0;

/// The state of an alarm as reported by the monitoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    /// The metric is within its threshold.
    Ok,
    /// The metric breached its threshold.
    Alarm,
    /// Not enough data to evaluate.
    InsufficientData,
}

impl AlarmState {
    /// Returns the state in the backend's spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Alarm => "ALARM",
            Self::InsufficientData => "INSUFFICIENT_DATA",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmState {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "ALARM" => Ok(Self::Alarm),
            "INSUFFICIENT_DATA" => Ok(Self::InsufficientData),
            other => Err(AggregatorError::invalid_rule(format!(
                "unknown alarm state '{other}', expected OK, ALARM or INSUFFICIENT_DATA"
            ))),
        }
    }
}

/// A name/value pair identifying one metric stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension name.
    pub name: String,
    /// Dimension value.
    pub value: String,
}

impl Dimension {
    /// Creates a new dimension.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The single metric an alarm evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricStream {
    /// Namespace containing the metric.
    pub namespace: String,
    /// Metric name.
    pub metric_name: String,
    /// Dimensions selecting the stream.
    pub dimensions: Vec<Dimension>,
}

impl MetricStream {
    /// Creates a metric stream with no dimensions.
    #[must_use]
    pub fn new(namespace: impl Into<String>, metric_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: Vec::new(),
        }
    }

    /// Adds a dimension.
    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.push(Dimension::new(name, value));
        self
    }
}

/// Current state of one alarm, fetched fresh for each invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSnapshot {
    /// Backend-assigned alarm name.
    pub name: String,
    /// Current state.
    pub state: AlarmState,
    /// The watched metric. `None` for alarms over metric math expressions.
    pub metric: Option<MetricStream>,
}

impl AlarmSnapshot {
    /// Creates a snapshot with no metric stream.
    #[must_use]
    pub fn new(name: impl Into<String>, state: AlarmState) -> Self {
        Self {
            name: name.into(),
            state,
            metric: None,
        }
    }

    /// Sets the metric stream.
    #[must_use]
    pub fn with_metric(mut self, metric: MetricStream) -> Self {
        self.metric = Some(metric);
        self
    }
}

/// A data point written to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    /// Metric name.
    pub metric_name: String,
    /// Dimensions selecting the stream.
    pub dimensions: Vec<Dimension>,
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    pub value: f64,
}

impl MetricDatum {
    /// Builds the breaching datum for a stream, stamped `now`.
    #[must_use]
    pub fn breaching(stream: &MetricStream, now: DateTime<Utc>) -> Self {
        Self {
            metric_name: stream.metric_name.clone(),
            dimensions: stream.dimensions.clone(),
            timestamp: now,
            value: BREACH_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    mod alarm_state_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("OK", AlarmState::Ok ; "ok")]
        #[test_case("ALARM", AlarmState::Alarm ; "alarm")]
        #[test_case("INSUFFICIENT_DATA", AlarmState::InsufficientData ; "insufficient data")]
        fn parses_backend_spelling(input: &str, expected: AlarmState) {
            assert_eq!(input.parse::<AlarmState>().unwrap(), expected);
            assert_eq!(expected.as_str(), input);
        }

        #[test]
        fn rejects_unknown_spelling() {
            assert!("alarm".parse::<AlarmState>().is_err());
            assert!("".parse::<AlarmState>().is_err());
        }

        #[test]
        fn serde_uses_backend_spelling() {
            let json = serde_json::to_string(&AlarmState::InsufficientData).unwrap();
            assert_eq!(json, "\"INSUFFICIENT_DATA\"");
            let state: AlarmState = serde_json::from_str("\"ALARM\"").unwrap();
            assert_eq!(state, AlarmState::Alarm);
        }

        #[test]
        fn display() {
            assert_eq!(AlarmState::Ok.to_string(), "OK");
        }
    }

    mod datum_tests {
        use super::*;

        #[test]
        fn breaching_datum_copies_stream() {
            let stream = MetricStream::new("App/Apache", "BusyWorkers")
                .with_dimension("InstanceId", "i-123");
            let now = Utc::now();
            let datum = MetricDatum::breaching(&stream, now);

            assert_eq!(datum.metric_name, "BusyWorkers");
            assert_eq!(datum.dimensions, vec![Dimension::new("InstanceId", "i-123")]);
            assert_eq!(datum.timestamp, now);
            assert!((datum.value - BREACH_VALUE).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn snapshot_builder() {
        let snap = AlarmSnapshot::new("prod-apache-busy", AlarmState::Alarm)
            .with_metric(MetricStream::new("App", "Busy"));
        assert_eq!(snap.name, "prod-apache-busy");
        assert_eq!(snap.metric.unwrap().metric_name, "Busy");
    }
}
