//! # Durable Flows
//!
//! Condemned subscribers leave both the live registry and the file-backed
//! snapshot; SUBSCRIBER messages keep the snapshot in step with the API.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cep_01_dispatch::testing::RecordingMetrics;
    use cep_01_dispatch::{
        DispatchContext, InMemoryPubSubRegistry, InMemorySubscriberRegistry, MetricsSink,
        NodeIdentity, OutboundDispatcher, Outcome, SubscriberRegistry,
    };
    use proxy_runtime::{FileSubscriptionStore, StoreInit};
    use shared_bus::{EventPublisher, InMemoryEventBus, MessageStatus, RoutedMessage, Shutdown};
    use shared_types::{SubscriberAction, SubscriberRecord, SubscriptionEntry};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use uuid::Uuid;

    use crate::integration::support::{closed_port, consumer, new_event, rest_client};

    const ADDRESS: &str = "/cluster/node/worker-2/sync/gnss-status/gnss-sync-status";
    const NODE: &str = "worker-2";
    const NS: &str = "openshift-ptp";
    const THRESHOLD: u32 = 3;

    struct Durable {
        bus: InMemoryEventBus,
        shutdown: Shutdown,
        subscribers: Arc<InMemorySubscriberRegistry>,
        metrics: Arc<RecordingMetrics>,
        store: Arc<FileSubscriptionStore>,
        dispatcher: JoinHandle<()>,
        _dir: tempfile::TempDir,
    }

    async fn start() -> Durable {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            FileSubscriptionStore::init(
                dir.path(),
                NODE,
                NS,
                StoreInit {
                    interval: Duration::from_millis(10),
                    attempts: 1,
                },
            )
            .await
            .expect("store"),
        );
        let subscribers = Arc::new(InMemorySubscriberRegistry::new(THRESHOLD));
        let metrics = RecordingMetrics::new();
        let ctx = DispatchContext::new(
            Arc::new(InMemoryPubSubRegistry::new()),
            subscribers.clone(),
            rest_client(Duration::from_secs(2)),
            metrics.clone(),
        )
        .with_store(store.clone(), NodeIdentity::new(NODE, NS));

        let (bus, receivers) = InMemoryEventBus::new();
        let shutdown = Shutdown::new();
        let dispatcher = OutboundDispatcher::new(ctx);
        let listener = shutdown.listener();
        let handle = tokio::spawn(async move { dispatcher.run(receivers.event_out, listener).await });

        Durable {
            bus,
            shutdown,
            subscribers,
            metrics,
            store,
            dispatcher: handle,
            _dir: dir,
        }
    }

    fn record(client_id: Uuid, endpoint: String) -> SubscriberRecord {
        SubscriberRecord {
            client_id,
            endpoint_uri: Some(endpoint),
            subscriptions: vec![SubscriptionEntry {
                id: format!("sub-{client_id}"),
                resource: ADDRESS.into(),
            }],
            action: SubscriberAction::Upsert,
        }
    }

    async fn persisted_clients(store: &FileSubscriptionStore) -> Vec<Uuid> {
        store
            .load(NODE, NS)
            .await
            .expect("load")
            .into_iter()
            .map(|r| r.client_id)
            .collect()
    }

    async fn publish_subscriber(bus: &InMemoryEventBus, record: &SubscriberRecord) {
        let data = serde_json::to_vec(record).expect("encode record");
        bus.publish_out(
            RoutedMessage::subscriber(ADDRESS, record.client_id, MessageStatus::Success)
                .with_data(data),
        )
        .await
        .expect("publish subscriber");
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        timeout(Duration::from_secs(3), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition reached");
    }

    async fn stop(fx: Durable) {
        fx.shutdown.trigger();
        timeout(Duration::from_secs(1), fx.dispatcher)
            .await
            .expect("dispatcher stopped")
            .expect("join");
    }

    #[tokio::test]
    async fn test_unreachable_subscriber_removed_from_registry_and_snapshot() {
        let fx = start().await;
        let (addr, consumer) = consumer().await;
        let healthy = Uuid::new_v4();
        let dead = Uuid::new_v4();
        let records = [
            record(healthy, format!("http://{addr}/u1")),
            record(dead, format!("http://127.0.0.1:{}/u2", closed_port())),
        ];

        // Registration arrives the way the API would announce it.
        for r in &records {
            fx.subscribers.restore(r);
            publish_subscriber(&fx.bus, r).await;
        }
        fx.metrics.adjust_active_subscriptions(2);

        for _ in 0..THRESHOLD {
            fx.bus
                .publish_out(RoutedMessage::event(ADDRESS, new_event(ADDRESS)))
                .await
                .expect("publish");
        }
        wait_for(|| {
            fx.metrics.received(ADDRESS, Outcome::Success) == THRESHOLD as u64
                && fx.subscribers.client(dead).is_none()
        })
        .await;
        // The snapshot is cleaned up right after the registry deletion.
        let store = fx.store.clone();
        timeout(Duration::from_secs(3), async {
            while persisted_clients(&store).await != vec![healthy] {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condemned client removed from snapshot");

        assert_eq!(fx.subscribers.failure_count(healthy), 0);
        assert_eq!(fx.metrics.adjustments(), vec![2, -1]);
        assert_eq!(fx.metrics.received(ADDRESS, Outcome::Failed), THRESHOLD as u64);
        assert_eq!(consumer.events("u1").await.len(), THRESHOLD as usize);

        stop(fx).await;
    }

    #[tokio::test]
    async fn test_subscriber_messages_maintain_snapshot() {
        let fx = start().await;
        let client = Uuid::new_v4();
        let r = record(client, "http://consumer:9089/event".into());

        publish_subscriber(&fx.bus, &r).await;
        let store = fx.store.clone();
        timeout(Duration::from_secs(3), async {
            while persisted_clients(&store).await != vec![client] {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("upsert persisted");

        fx.bus
            .publish_out(RoutedMessage::subscriber(ADDRESS, client, MessageStatus::Delete))
            .await
            .expect("publish delete");
        timeout(Duration::from_secs(3), async {
            while !persisted_clients(&store).await.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("delete persisted");

        stop(fx).await;
    }
}
