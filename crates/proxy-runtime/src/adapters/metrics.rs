//! Metrics sink backed by the process Prometheus registry.

use cep_01_dispatch::{MetricsSink, Outcome};
use proxy_telemetry::{
    adjust_subscription_gauge, record_event_ack, record_event_received, record_status_check,
};

/// Forwards dispatcher updates to the `cne_*` collectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn event_received(&self, address: &str, outcome: Outcome) {
        record_event_received(address, outcome.as_str());
    }

    fn event_acknowledged(&self, address: &str, outcome: Outcome) {
        record_event_ack(address, outcome.as_str());
    }

    fn status_acknowledged(&self, address: &str, outcome: Outcome) {
        record_status_check(address, outcome.as_str());
    }

    fn adjust_active_subscriptions(&self, delta: i64) {
        adjust_subscription_gauge(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_telemetry::{API_SUBSCRIPTIONS, EVENTS_ACK, EVENTS_RECEIVED, STATUS_CHECK_PUBLISHED};

    #[test]
    fn test_outcomes_map_to_status_label() {
        let address = "/runtime/metrics/test";
        let sink = PrometheusMetrics;

        sink.event_received(address, Outcome::Success);
        sink.event_received(address, Outcome::Failed);
        sink.event_received(address, Outcome::Failed);
        sink.event_acknowledged(address, Outcome::Success);
        sink.status_acknowledged(address, Outcome::Failed);

        assert_eq!(
            EVENTS_RECEIVED.with_label_values(&[address, "success"]).get(),
            1.0
        );
        assert_eq!(
            EVENTS_RECEIVED.with_label_values(&[address, "failed"]).get(),
            2.0
        );
        assert_eq!(EVENTS_ACK.with_label_values(&[address, "success"]).get(), 1.0);
        assert_eq!(
            STATUS_CHECK_PUBLISHED
                .with_label_values(&[address, "failed"])
                .get(),
            1.0
        );
    }

    #[test]
    fn test_gauge_adjusts_by_delta() {
        let gauge = API_SUBSCRIPTIONS.with_label_values(&["active"]);
        let before = gauge.get();
        PrometheusMetrics.adjust_active_subscriptions(3);
        PrometheusMetrics.adjust_active_subscriptions(-1);
        assert_eq!(gauge.get() - before, 2.0);
    }
}
