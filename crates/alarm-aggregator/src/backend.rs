//! The monitoring backend seam.
//!
//! The aggregator only needs two backend operations: describing alarms by
//! name and writing metric data. [`FakeMonitoringBackend`] keeps everything
//! in memory and records every call, which is what the tests and dry runs
//! use. The CloudWatch implementation lives in [`crate::cloudwatch`] behind
//! the `cloudwatch` feature.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AggregatorError, Result};
use crate::types::{AlarmSnapshot, MetricDatum};

/// Operations the aggregator performs against the monitoring backend.
#[allow(async_fn_in_trait)]
pub trait MonitoringBackend {
    /// Describes the alarms named in `alarm_names`.
    ///
    /// The result may contain any number of alarms in any order.
    async fn describe_alarms(&self, alarm_names: &[String]) -> Result<Vec<AlarmSnapshot>>;

    /// Writes one data point into `namespace`.
    async fn put_metric_data(&self, namespace: &str, datum: MetricDatum) -> Result<()>;
}

/// A recorded put-metric-data call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    /// Namespace the datum was written to.
    pub namespace: String,
    /// The datum.
    pub datum: MetricDatum,
}

#[derive(Debug, Default)]
struct FakeState {
    alarms: Vec<AlarmSnapshot>,
    describe_calls: Vec<Vec<String>>,
    puts: Vec<RecordedPut>,
    put_attempts: usize,
    describe_failure: Option<String>,
    failing_metrics: HashSet<String>,
}

/// An in-memory backend for testing and dry runs.
///
/// `describe_alarms` returns every stored alarm regardless of the filter,
/// like a backend that resolves names loosely. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeMonitoringBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMonitoringBackend {
    /// Creates an empty fake backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fake backend holding `alarms`.
    #[must_use]
    pub fn with_alarms(alarms: impl IntoIterator<Item = AlarmSnapshot>) -> Self {
        let backend = Self::new();
        backend.state.lock().alarms.extend(alarms);
        backend
    }

    /// Stores another alarm.
    pub fn insert_alarm(&self, alarm: AlarmSnapshot) {
        self.state.lock().alarms.push(alarm);
    }

    /// Makes every subsequent describe call fail with `reason`.
    pub fn fail_describe(&self, reason: impl Into<String>) {
        self.state.lock().describe_failure = Some(reason.into());
    }

    /// Makes put calls for `metric_name` fail.
    pub fn fail_metric(&self, metric_name: impl Into<String>) {
        self.state.lock().failing_metrics.insert(metric_name.into());
    }

    /// Name filters of every describe call so far.
    #[must_use]
    pub fn describe_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().describe_calls.clone()
    }

    /// Every successful put so far.
    #[must_use]
    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state.lock().puts.clone()
    }

    /// Total number of backend calls, successful or not.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let state = self.state.lock();
        state.describe_calls.len() + state.put_attempts
    }
}

impl MonitoringBackend for FakeMonitoringBackend {
    async fn describe_alarms(&self, alarm_names: &[String]) -> Result<Vec<AlarmSnapshot>> {
        let mut state = self.state.lock();
        state.describe_calls.push(alarm_names.to_vec());
        if let Some(reason) = &state.describe_failure {
            return Err(AggregatorError::BackendQuery {
                reason: reason.clone(),
            });
        }
        debug!(count = state.alarms.len(), "fake describe");
        Ok(state.alarms.clone())
    }

    async fn put_metric_data(&self, namespace: &str, datum: MetricDatum) -> Result<()> {
        let mut state = self.state.lock();
        state.put_attempts += 1;
        if state.failing_metrics.contains(&datum.metric_name) {
            return Err(AggregatorError::MetricEmission {
                metric: datum.metric_name,
                reason: "injected failure".to_string(),
            });
        }
        state.puts.push(RecordedPut {
            namespace: namespace.to_string(),
            datum,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlarmState, MetricStream};
    use chrono::Utc;

    fn datum(metric: &str) -> MetricDatum {
        MetricDatum::breaching(&MetricStream::new("App", metric), Utc::now())
    }

    #[tokio::test]
    async fn describe_records_filter_and_returns_alarms() {
        let backend =
            FakeMonitoringBackend::with_alarms([AlarmSnapshot::new("a", AlarmState::Alarm)]);
        let names = vec!["a".to_string(), "b".to_string()];

        let alarms = backend.describe_alarms(&names).await.unwrap();

        assert_eq!(alarms.len(), 1);
        assert_eq!(backend.describe_calls(), vec![names]);
    }

    #[tokio::test]
    async fn describe_failure() {
        let backend = FakeMonitoringBackend::new();
        backend.fail_describe("access denied");

        let err = backend.describe_alarms(&[]).await.unwrap_err();

        assert!(matches!(err, AggregatorError::BackendQuery { reason } if reason == "access denied"));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn put_records_datum() {
        let backend = FakeMonitoringBackend::new();
        backend.put_metric_data("App", datum("Busy")).await.unwrap();

        let puts = backend.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].namespace, "App");
        assert_eq!(puts[0].datum.metric_name, "Busy");
    }

    #[tokio::test]
    async fn put_failure_is_per_metric() {
        let backend = FakeMonitoringBackend::new();
        backend.fail_metric("Broken");

        assert!(backend.put_metric_data("App", datum("Broken")).await.is_err());
        assert!(backend.put_metric_data("App", datum("Busy")).await.is_ok());
        assert_eq!(backend.puts().len(), 1);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let backend = FakeMonitoringBackend::new();
        let clone = backend.clone();
        clone.insert_alarm(AlarmSnapshot::new("a", AlarmState::Ok));
        assert_eq!(backend.describe_alarms(&[]).await.unwrap().len(), 1);
    }
}
