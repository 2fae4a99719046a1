//! # Delivery Flows
//!
//! The outbound dispatcher with the real REST client against loopback
//! consumers.
//!
//! ## Flows Tested
//!
//! 1. **Fan-out**: every subscriber gets its own copy with a fresh id
//! 2. **Any HTTP answer resets failures**: a 500 counts as failed delivery
//!    but never escalates
//! 3. **Timeouts escalate** like refused connections
//! 4. **Legacy subscription**: one endpoint, event id replaced by the
//!    subscription id
//! 5. **Acknowledgement**: SUCCESS/FAILED echoes are posted to the publisher

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use cep_01_dispatch::testing::RecordingMetrics;
    use cep_01_dispatch::{
        DispatchContext, InMemoryPubSubRegistry, InMemorySubscriberRegistry, InboundFallbackLoop,
        OutboundDispatcher, Outcome, SubscriberRegistry,
    };
    use shared_bus::{BusReceivers, EventPublisher, InMemoryEventBus, MessageStatus, RoutedMessage, Shutdown};
    use shared_types::{CloudEvent, PubSubRecord};
    use tokio::time::timeout;
    use uuid::Uuid;

    use crate::integration::support::{closed_port, consumer, new_event, rest_client};

    const ADDRESS: &str = "/cluster/node/worker-1/sync/ptp-status/lock-state";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Harness {
        pubsub: Arc<InMemoryPubSubRegistry>,
        subscribers: Arc<InMemorySubscriberRegistry>,
        metrics: Arc<RecordingMetrics>,
        dispatcher: OutboundDispatcher,
    }

    fn harness(threshold: u32, request_timeout: Duration) -> Harness {
        let pubsub = Arc::new(InMemoryPubSubRegistry::new());
        let subscribers = Arc::new(InMemorySubscriberRegistry::new(threshold));
        let metrics = RecordingMetrics::new();
        let ctx = DispatchContext::new(
            pubsub.clone(),
            subscribers.clone(),
            rest_client(request_timeout),
            metrics.clone(),
        );
        Harness {
            pubsub,
            subscribers,
            metrics,
            dispatcher: OutboundDispatcher::new(ctx),
        }
    }

    // =============================================================================
    // FAN-OUT
    // =============================================================================

    #[tokio::test]
    async fn test_fan_out_gives_each_subscriber_a_fresh_id() {
        let (addr, consumer) = consumer().await;
        let h = harness(10, Duration::from_secs(2));
        for name in ["a", "b", "c"] {
            h.subscribers
                .subscribe(Uuid::new_v4(), Some(format!("http://{addr}/{name}")), ADDRESS);
        }
        let raw = new_event(ADDRESS);
        let original = CloudEvent::from_bytes(&raw).expect("decode");

        h.dispatcher
            .dispatch(RoutedMessage::event(ADDRESS, raw))
            .await;

        let mut ids = HashSet::new();
        for name in ["a", "b", "c"] {
            let events = consumer.events(name).await;
            assert_eq!(events.len(), 1, "route {name}");
            assert_eq!(events[0].source, original.source);
            assert_eq!(events[0].data, original.data);
            assert_ne!(events[0].id, original.id);
            ids.insert(events[0].id.clone());
        }
        assert_eq!(ids.len(), 3);
        assert_eq!(h.metrics.received(ADDRESS, Outcome::Success), 3);
    }

    #[tokio::test]
    async fn test_server_error_is_failed_delivery_without_escalation() {
        let (addr, _consumer) = consumer().await;
        let h = harness(2, Duration::from_secs(2));
        let client = Uuid::new_v4();
        h.subscribers
            .subscribe(client, Some(format!("http://{addr}/broken")), ADDRESS);

        for _ in 0..3 {
            h.dispatcher
                .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
                .await;
        }

        assert_eq!(h.metrics.received(ADDRESS, Outcome::Failed), 3);
        assert_eq!(h.subscribers.failure_count(client), 0);
        assert!(h.subscribers.client(client).is_some());
        assert!(h.metrics.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_timeouts_escalate_to_removal() {
        let (addr, _consumer) = consumer().await;
        let h = harness(2, Duration::from_millis(100));
        let client = Uuid::new_v4();
        h.subscribers
            .subscribe(client, Some(format!("http://{addr}/slow")), ADDRESS);

        h.dispatcher
            .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
            .await;
        assert_eq!(h.subscribers.failure_count(client), 1);

        h.dispatcher
            .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
            .await;
        assert!(h.subscribers.client(client).is_none());
        assert_eq!(h.metrics.adjustments(), vec![-1]);
    }

    #[tokio::test]
    async fn test_recovered_subscriber_starts_over() {
        let (addr, _consumer) = consumer().await;
        let h = harness(3, Duration::from_secs(2));
        let client = Uuid::new_v4();
        h.subscribers.subscribe(
            client,
            Some(format!("http://127.0.0.1:{}/event", closed_port())),
            ADDRESS,
        );

        for _ in 0..2 {
            h.dispatcher
                .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
                .await;
        }
        assert_eq!(h.subscribers.failure_count(client), 2);

        // Same client re-registers a working endpoint.
        h.subscribers
            .subscribe(client, Some(format!("http://{addr}/event")), ADDRESS);
        h.dispatcher
            .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
            .await;
        assert_eq!(h.subscribers.failure_count(client), 0);
        assert!(h.subscribers.client(client).is_some());
    }

    // =============================================================================
    // LEGACY SUBSCRIPTION
    // =============================================================================

    #[tokio::test]
    async fn test_legacy_subscription_receives_subscription_id() {
        let (addr, consumer) = consumer().await;
        let h = harness(10, Duration::from_secs(2));
        h.pubsub.add_subscription(PubSubRecord::new(
            "legacy-sub-1",
            ADDRESS,
            Some(format!("http://{addr}/legacy")),
        ));

        h.dispatcher
            .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
            .await;

        let events = consumer.events("legacy").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "legacy-sub-1");
        assert_eq!(h.metrics.received(ADDRESS, Outcome::Success), 1);
    }

    #[tokio::test]
    async fn test_legacy_refused_is_counted_but_not_tracked() {
        let h = harness(1, Duration::from_secs(2));
        h.pubsub.add_subscription(PubSubRecord::new(
            "legacy-sub-2",
            ADDRESS,
            Some(format!("http://127.0.0.1:{}/legacy", closed_port())),
        ));

        h.dispatcher
            .dispatch(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
            .await;

        assert_eq!(h.metrics.received(ADDRESS, Outcome::Failed), 1);
        assert!(h.metrics.adjustments().is_empty());
        assert!(h.pubsub.remove_subscription(ADDRESS).is_some());
    }

    // =============================================================================
    // ACKNOWLEDGEMENTS THROUGH THE BUS
    // =============================================================================

    #[tokio::test]
    async fn test_fallback_echo_acknowledged_over_http() {
        let (addr, consumer) = consumer().await;
        let h = harness(10, Duration::from_secs(2));
        h.pubsub.add_publisher(PubSubRecord::new(
            "publisher-9",
            ADDRESS,
            Some(format!("http://{addr}/ack")),
        ));

        let (bus, receivers) = InMemoryEventBus::new();
        let BusReceivers {
            event_in,
            event_out,
            status,
        } = receivers;
        let shutdown = Shutdown::new();
        let fallback = InboundFallbackLoop::new(bus.outbound_sender());
        let fallback_stop = shutdown.listener();
        let fallback_task =
            tokio::spawn(async move { fallback.run(event_in, status, fallback_stop).await });
        let dispatcher = h.dispatcher;
        let dispatch_stop = shutdown.listener();
        let dispatch_task = tokio::spawn(async move { dispatcher.run(event_out, dispatch_stop).await });

        bus.publish_in(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
            .await
            .expect("publish event");
        bus.publish_in(RoutedMessage::status(ADDRESS, MessageStatus::New))
            .await
            .expect("publish status");

        timeout(Duration::from_secs(2), async {
            while consumer.bodies("ack").await.is_empty()
                || h.metrics.status(ADDRESS, Outcome::Success) == 0
            {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("ack posted and status counted");

        let acks = consumer.bodies("ack").await;
        let ack: serde_json::Value = serde_json::from_slice(&acks[0]).expect("json");
        assert_eq!(ack["eventId"], "publisher-9");
        assert_eq!(ack["status"], "SUCCESS");
        assert_eq!(h.metrics.acked(ADDRESS, Outcome::Success), 1);

        shutdown.trigger();
        for task in [fallback_task, dispatch_task] {
            timeout(Duration::from_secs(1), task)
                .await
                .expect("loop stopped")
                .expect("join");
        }
    }
}
