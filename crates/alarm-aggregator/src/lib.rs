//! Alarm aggregation: drive aggregate alarms from the combined state of
//! several source alarms.
//!
//! When a source alarm enters ALARM, the aggregator looks up the current
//! state of every alarm named in its [`AggregationRule`]. If each source is
//! in its expected state, every target alarm is pushed into ALARM by
//! writing a data point of [`BREACH_VALUE`] to the metric it watches. The
//! backend's own alarm evaluation does the rest.
//!
//! ```text
//! notification ──► intake ──► correlator ──► decider ──► put metric data
//!                    │            │
//!              not ALARM:   describe alarms
//!                no-op
//! ```
//!
//! # Example
//!
//! ```rust
//! use alarm_aggregator::{
//!     AggregationRule, AlarmAggregator, AlarmSnapshot, AlarmState, AlarmStateChange,
//!     FakeMonitoringBackend, MetricStream,
//! };
//!
//! # tokio_test_block(async {
//! let rule = AggregationRule::builder()
//!     .source("apache-busy", AlarmState::Alarm)
//!     .source("db-blocked-conn", AlarmState::Ok)
//!     .target("aggregate")
//!     .build()
//!     .unwrap();
//!
//! let backend = FakeMonitoringBackend::with_alarms([
//!     AlarmSnapshot::new("prod-apache-busy", AlarmState::Alarm),
//!     AlarmSnapshot::new("prod-db-blocked-conn", AlarmState::Ok),
//!     AlarmSnapshot::new("prod-aggregate", AlarmState::Ok)
//!         .with_metric(MetricStream::new("App/Health", "AggregateTrigger")),
//! ]);
//!
//! let aggregator = AlarmAggregator::new(rule, backend.clone());
//! let change = AlarmStateChange::new("prod-apache-busy", AlarmState::Alarm);
//! let outcome = aggregator.process(&change).await.unwrap();
//!
//! assert_eq!(outcome.emitted(), 1);
//! assert_eq!(backend.puts()[0].datum.metric_name, "AggregateTrigger");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     futures::executor::block_on(f)
//! # }
//! ```
//!
//! # Backends
//!
//! [`MonitoringBackend`] is implemented by [`FakeMonitoringBackend`] and,
//! with the `cloudwatch` feature, by `cloudwatch::CloudWatchBackend`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod aggregator;
pub mod backend;
#[cfg(feature = "cloudwatch")]
pub mod cloudwatch;
pub mod correlator;
pub mod decider;
pub mod error;
pub mod intake;
pub mod rule;
pub mod types;

// Re-export main types at crate root
pub use aggregator::{AlarmAggregator, InvocationOutcome, Preview};
pub use backend::{FakeMonitoringBackend, MonitoringBackend, RecordedPut};
pub use correlator::{CorrelationResult, correlate, correlate_snapshots};
pub use decider::{Decision, EmissionOutcome, HoldReason, TriggerTarget, decide, trigger};
pub use error::{AggregatorError, Result};
pub use intake::{AlarmStateChange, parse_message, parse_notification};
pub use rule::{AggregationRule, AggregationRuleBuilder, MatchPolicy, SourceExpectation};
pub use types::{AlarmSnapshot, AlarmState, BREACH_VALUE, Dimension, MetricDatum, MetricStream};
