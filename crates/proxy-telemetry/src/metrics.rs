//! Prometheus metrics for the cloud event proxy.
//!
//! Names follow the `cne_` prefix used by the dashboards:
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `cne_events_received` | counter | `address`, `status` |
//! | `cne_events_ack` | counter | `address`, `status` |
//! | `cne_status_check_published` | counter | `address`, `status` |
//! | `cne_api_subscriptions` | gauge | `status` |

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

/// Label value of the subscription gauge series tracking live subscriptions.
const ACTIVE: &str = "active";

lazy_static! {
    /// Process metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Events delivered (or not) to consumers
    pub static ref EVENTS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("cne_events_received", "Metric to get number of events received"),
        &["address", "status"]
    ).expect("metric creation failed");

    /// Acknowledgements routed back to publishers
    pub static ref EVENTS_ACK: CounterVec = CounterVec::new(
        Opts::new("cne_events_ack", "Metric to get number of events produced"),
        &["address", "status"]
    ).expect("metric creation failed");

    /// Status checks answered
    pub static ref STATUS_CHECK_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("cne_status_check_published", "Metric to get number of status check published"),
        &["address", "status"]
    ).expect("metric creation failed");

    /// Active subscriptions
    pub static ref API_SUBSCRIPTIONS: GaugeVec = GaugeVec::new(
        Opts::new("cne_api_subscriptions", "Metric to get number of subscriptions"),
        &["status"]
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`].
///
/// Calling it again is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS_RECEIVED.clone()),
        Box::new(EVENTS_ACK.clone()),
        Box::new(STATUS_CHECK_PUBLISHED.clone()),
        Box::new(API_SUBSCRIPTIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

pub fn record_event_received(address: &str, status: &str) {
    EVENTS_RECEIVED.with_label_values(&[address, status]).inc();
}

pub fn record_event_ack(address: &str, status: &str) {
    EVENTS_ACK.with_label_values(&[address, status]).inc();
}

pub fn record_status_check(address: &str, status: &str) {
    STATUS_CHECK_PUBLISHED
        .with_label_values(&[address, status])
        .inc();
}

/// Move the active subscription gauge by `delta`.
pub fn adjust_subscription_gauge(delta: i64) {
    API_SUBSCRIPTIONS
        .with_label_values(&[ACTIVE])
        .add(delta as f64);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
}
