//! CloudWatch monitoring backend.
//!
//! Wraps `aws-sdk-cloudwatch` to implement [`MonitoringBackend`]. Only
//! metric alarms are described; composite alarms have no metric to breach.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::error::ProvideErrorMetadata;
use aws_sdk_cloudwatch::types::{self as cw, AlarmType, StateValue};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::backend::MonitoringBackend;
use crate::error::{AggregatorError, Result};
use crate::types::{AlarmSnapshot, AlarmState, Dimension, MetricDatum, MetricStream};

/// CloudWatch-backed [`MonitoringBackend`].
///
/// The SDK client is built on first use, so invocations that never reach
/// the backend never resolve credentials or region.
#[derive(Debug, Clone)]
pub struct CloudWatchBackend {
    client: Arc<OnceCell<Client>>,
    region: Option<String>,
}

impl CloudWatchBackend {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(OnceCell::new_with(Some(client))),
            region: None,
        }
    }

    /// Uses the default credential and region chain, optionally overriding
    /// the region.
    #[must_use]
    pub fn from_env(region: Option<String>) -> Self {
        Self {
            client: Arc::new(OnceCell::new()),
            region,
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = &self.region {
                    loader = loader.region(Region::new(region.clone()));
                }
                let config = loader.load().await;
                debug!(region = ?config.region(), "created CloudWatch client");
                Client::new(&config)
            })
            .await
    }
}

fn error_reason<E: ProvideErrorMetadata + std::fmt::Display>(err: &E) -> String {
    match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => err.to_string(),
    }
}

fn convert_state(state: &StateValue) -> Option<AlarmState> {
    match state {
        StateValue::Alarm => Some(AlarmState::Alarm),
        StateValue::Ok => Some(AlarmState::Ok),
        StateValue::InsufficientData => Some(AlarmState::InsufficientData),
        _ => None,
    }
}

fn convert_alarm(alarm: &cw::MetricAlarm) -> Option<AlarmSnapshot> {
    let name = alarm.alarm_name()?;
    let Some(state) = alarm.state_value().and_then(convert_state) else {
        warn!(alarm = %name, state = ?alarm.state_value(), "skipping alarm with unknown state");
        return None;
    };

    let mut snapshot = AlarmSnapshot::new(name, state);
    if let (Some(namespace), Some(metric_name)) = (alarm.namespace(), alarm.metric_name()) {
        let dimensions = alarm
            .dimensions()
            .iter()
            .filter_map(|d| Some(Dimension::new(d.name()?, d.value()?)))
            .collect();
        snapshot = snapshot.with_metric(MetricStream {
            namespace: namespace.to_string(),
            metric_name: metric_name.to_string(),
            dimensions,
        });
    }
    Some(snapshot)
}

fn convert_datum(datum: &MetricDatum) -> cw::MetricDatum {
    let dimensions = datum
        .dimensions
        .iter()
        .map(|d| cw::Dimension::builder().name(&d.name).value(&d.value).build())
        .collect();
    cw::MetricDatum::builder()
        .metric_name(&datum.metric_name)
        .set_dimensions(Some(dimensions))
        .timestamp(aws_smithy_types::DateTime::from_millis(
            datum.timestamp.timestamp_millis(),
        ))
        .value(datum.value)
        .build()
}

impl MonitoringBackend for CloudWatchBackend {
    async fn describe_alarms(&self, alarm_names: &[String]) -> Result<Vec<AlarmSnapshot>> {
        let mut snapshots = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client()
                .await
                .describe_alarms()
                .set_alarm_names(Some(alarm_names.to_vec()))
                .alarm_types(AlarmType::MetricAlarm)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AggregatorError::BackendQuery {
                    reason: error_reason(&e),
                })?;

            snapshots.extend(response.metric_alarms().iter().filter_map(convert_alarm));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(count = snapshots.len(), "described alarms");
        Ok(snapshots)
    }

    async fn put_metric_data(&self, namespace: &str, datum: MetricDatum) -> Result<()> {
        let cw_datum = convert_datum(&datum);
        self.client()
            .await
            .put_metric_data()
            .namespace(namespace)
            .metric_data(cw_datum)
            .send()
            .await
            .map_err(|e| AggregatorError::MetricEmission {
                metric: datum.metric_name.clone(),
                reason: error_reason(&e),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn converts_metric_alarm() {
        let alarm = cw::MetricAlarm::builder()
            .alarm_name("prod-apache-busy")
            .state_value(StateValue::Alarm)
            .namespace("App/Apache")
            .metric_name("BusyWorkers")
            .dimensions(
                cw::Dimension::builder()
                    .name("InstanceId")
                    .value("i-1")
                    .build(),
            )
            .build();

        let snapshot = convert_alarm(&alarm).unwrap();

        assert_eq!(snapshot.name, "prod-apache-busy");
        assert_eq!(snapshot.state, AlarmState::Alarm);
        let metric = snapshot.metric.unwrap();
        assert_eq!(metric.namespace, "App/Apache");
        assert_eq!(metric.dimensions, vec![Dimension::new("InstanceId", "i-1")]);
    }

    #[test]
    fn expression_alarm_has_no_metric() {
        let alarm = cw::MetricAlarm::builder()
            .alarm_name("expr")
            .state_value(StateValue::Ok)
            .build();

        let snapshot = convert_alarm(&alarm).unwrap();

        assert!(snapshot.metric.is_none());
    }

    #[test]
    fn alarm_without_state_is_skipped() {
        let alarm = cw::MetricAlarm::builder().alarm_name("x").build();
        assert!(convert_alarm(&alarm).is_none());
    }

    #[test]
    fn converts_datum() {
        let stream = MetricStream::new("App", "Trigger").with_dimension("Stack", "prod");
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();

        let datum = convert_datum(&MetricDatum::breaching(&stream, ts));

        assert_eq!(datum.metric_name(), Some("Trigger"));
        assert_eq!(datum.value(), Some(1.0));
        assert_eq!(datum.dimensions().len(), 1);
        assert_eq!(datum.timestamp().map(|t| t.secs()), Some(ts.timestamp()));
    }

    #[test]
    fn incomplete_dimension_is_skipped() {
        let alarm = cw::MetricAlarm::builder()
            .alarm_name("prod-db-blocked-conn")
            .state_value(StateValue::Ok)
            .namespace("App/Db")
            .metric_name("BlockedConnections")
            .dimensions(cw::Dimension::builder().name("Cluster").build())
            .dimensions(cw::Dimension::builder().name("Role").value("primary").build())
            .build();

        let metric = convert_alarm(&alarm).unwrap().metric.unwrap();

        assert_eq!(metric.dimensions, vec![Dimension::new("Role", "primary")]);
    }

    #[test]
    fn converts_datum_dimensions() {
        let stream = MetricStream::new("App", "Trigger")
            .with_dimension("Stack", "prod")
            .with_dimension("Tier", "web");
        let datum = convert_datum(&MetricDatum::breaching(&stream, Utc::now()));

        let dims: Vec<(Option<&str>, Option<&str>)> = datum
            .dimensions()
            .iter()
            .map(|d| (d.name(), d.value()))
            .collect();
        assert_eq!(dims, vec![(Some("Stack"), Some("prod")), (Some("Tier"), Some("web"))]);
    }
}
