//! # Outbound Dispatcher
//!
//! Single control loop draining the outbound queue until shutdown.
//!
//! ## Routing
//!
//! | Message                  | Handling                                              |
//! |--------------------------|-------------------------------------------------------|
//! | EVENT / NEW              | processor, else legacy subscription, else fan-out     |
//! | EVENT / SUCCESS, FAILED  | ack metric + `{eventId, status}` POST to publisher     |
//! | STATUS                   | status-ack metric                                     |
//! | SUBSCRIBER               | durable store upsert / cleanup (durable mode only)     |
//! | PUBLISHER                | ignored                                               |
//!
//! Fan-out is sequential per address. Failure counters are only touched
//! after a delivery attempt has returned.

use shared_bus::{EventReceiver, MessageStatus, MessageType, RoutedMessage, ShutdownListener};
use shared_types::{ClientId, CloudEvent, EventAck, SubscriberRecord};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::classify;
use crate::ports::outbound::Outcome;
use crate::service::context::DispatchContext;
use crate::service::lifecycle::SubscriberLifecycle;

/// HTTP status a subscriber must answer with to count as delivered.
const NO_CONTENT: u16 = 204;

/// Drains the outbound queue and applies delivery policy per message.
#[derive(Debug, Clone)]
pub struct OutboundDispatcher {
    ctx: DispatchContext,
    lifecycle: SubscriberLifecycle,
}

impl OutboundDispatcher {
    pub fn new(ctx: DispatchContext) -> Self {
        let lifecycle = SubscriberLifecycle::new(ctx.clone());
        Self { ctx, lifecycle }
    }

    /// Run until the shutdown signal fires.
    ///
    /// Pending messages are abandoned on shutdown. If every producer goes
    /// away the loop idles until shutdown.
    pub async fn run(&self, mut receiver: EventReceiver, mut shutdown: ShutdownListener) {
        info!(durable = self.ctx.is_durable(), "Outbound dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Outbound dispatcher stopping");
                    return;
                }
                msg = receiver.recv() => match msg {
                    Some(msg) => self.dispatch(msg).await,
                    None => {
                        warn!("Outbound queue closed, waiting for shutdown");
                        shutdown.wait().await;
                        info!("Outbound dispatcher stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Handle one message. Never fails: problems are logged and counted.
    pub async fn dispatch(&self, msg: RoutedMessage) {
        match msg.message_type {
            MessageType::Event => self.handle_event(msg).await,
            MessageType::Status => self.handle_status(&msg),
            MessageType::Subscriber => self.handle_subscriber(msg).await,
            MessageType::Publisher => {
                debug!(address = %msg.address, "Publisher message ignored by dispatcher");
            }
        }
    }

    async fn handle_event(&self, msg: RoutedMessage) {
        let Some(data) = msg.data.as_deref() else {
            warn!(address = %msg.address, status = %msg.status, "Event message without data dropped");
            return;
        };
        let event = match CloudEvent::from_bytes(data) {
            Ok(event) => event,
            Err(e) => {
                error!(address = %msg.address, error = %e, "Failed to decode event, dropped");
                return;
            }
        };

        match msg.status {
            MessageStatus::New => self.deliver_new(&msg, event).await,
            MessageStatus::Success | MessageStatus::Failed => {
                self.acknowledge(&msg.address, msg.status).await;
            }
            MessageStatus::Delete => {
                debug!(address = %msg.address, "DELETE status has no meaning for events");
            }
        }
    }

    async fn deliver_new(&self, msg: &RoutedMessage, event: CloudEvent) {
        let address = msg.address.as_str();
        let metrics = &self.ctx.metrics;

        if let Some(processor) = msg.process_event.as_ref() {
            if let Err(e) = processor.process(&event).await {
                error!(address = %address, event_id = %event.id, error = %e, "Event processor failed");
                metrics.event_received(address, Outcome::Failed);
            }
            return;
        }

        if let Some(subscription) = self.ctx.pubsub.has_subscription(address) {
            // Legacy single-endpoint path: no failure tracking.
            match subscription.endpoint_uri.as_deref().filter(|uri| !uri.is_empty()) {
                Some(uri) => {
                    let event = event.with_id(subscription.id.clone());
                    let outcome = match self.ctx.rest.post_event(uri, &event).await {
                        Ok(()) => Outcome::Success,
                        Err(e) => {
                            error!(address = %address, endpoint = %uri, error = %e, "Failed to post event to subscription");
                            Outcome::Failed
                        }
                    };
                    metrics.event_received(address, outcome);
                }
                None => {
                    info!(address = %address, event = %event.json_string(), "Subscription has no endpoint, event logged");
                    metrics.event_received(address, Outcome::Success);
                }
            }
            return;
        }

        let subscribers = self.ctx.subscribers.subscribers_by_resource(address);
        if subscribers.is_empty() {
            warn!(address = %address, "No subscribers for address, event not delivered");
            metrics.event_received(address, Outcome::Failed);
            return;
        }

        for (client_id, endpoint) in subscribers {
            let Some(endpoint) = endpoint.filter(|uri| !uri.is_empty()) else {
                error!(address = %address, client_id = %client_id, "Registered subscriber has no endpoint, skipped");
                continue;
            };
            self.deliver_to_subscriber(address, client_id, &endpoint, &event)
                .await;
        }
    }

    async fn deliver_to_subscriber(
        &self,
        address: &str,
        client_id: ClientId,
        endpoint: &str,
        event: &CloudEvent,
    ) {
        let metrics = &self.ctx.metrics;
        let event = event.with_id(Uuid::new_v4().to_string());
        let body = match event.to_bytes() {
            Ok(body) => body,
            Err(e) => {
                error!(address = %address, client_id = %client_id, error = %e, "Failed to encode event");
                metrics.event_received(address, Outcome::Failed);
                return;
            }
        };

        match self.ctx.rest.post_cloud_event(endpoint, body).await {
            Ok(status) => {
                self.lifecycle.record_success(client_id);
                if status == NO_CONTENT {
                    debug!(address = %address, client_id = %client_id, event_id = %event.id, "Event delivered");
                    metrics.event_received(address, Outcome::Success);
                } else {
                    warn!(
                        address = %address,
                        client_id = %client_id,
                        endpoint = %endpoint,
                        status,
                        "Subscriber answered with unexpected status"
                    );
                    metrics.event_received(address, Outcome::Failed);
                }
            }
            Err(e) => {
                metrics.event_received(address, Outcome::Failed);
                let cause = classify(&e);
                error!(
                    address = %address,
                    client_id = %client_id,
                    endpoint = %endpoint,
                    cause = %cause,
                    error = %e,
                    "Failed to deliver event"
                );
                if cause.is_connectivity() {
                    self.lifecycle
                        .record_connectivity_failure(client_id, address)
                        .await;
                }
            }
        }
    }

    async fn acknowledge(&self, address: &str, status: MessageStatus) {
        let Some(publisher) = self.ctx.pubsub.has_publisher(address) else {
            debug!(address = %address, status = %status, "No publisher to acknowledge");
            return;
        };
        let outcome = if status == MessageStatus::Success {
            Outcome::Success
        } else {
            Outcome::Failed
        };
        self.ctx.metrics.event_acknowledged(address, outcome);

        let Some(uri) = publisher.endpoint_uri.as_deref().filter(|uri| !uri.is_empty()) else {
            return;
        };
        let ack = EventAck {
            event_id: publisher.id.clone(),
            status: status.to_string(),
        };
        let body = match serde_json::to_vec(&ack) {
            Ok(body) => body,
            Err(e) => {
                error!(address = %address, error = %e, "Failed to encode acknowledgement");
                return;
            }
        };
        match self.ctx.rest.post(uri, body).await {
            Ok(code) => debug!(address = %address, endpoint = %uri, code, "Acknowledgement posted"),
            Err(e) => warn!(address = %address, endpoint = %uri, error = %e, "Failed to post acknowledgement"),
        }
    }

    fn handle_status(&self, msg: &RoutedMessage) {
        if msg.status == MessageStatus::Success {
            self.ctx
                .metrics
                .status_acknowledged(&msg.address, Outcome::Success);
        } else {
            error!(address = %msg.address, status = %msg.status, "Status check failed");
            self.ctx
                .metrics
                .status_acknowledged(&msg.address, Outcome::Failed);
        }
    }

    async fn handle_subscriber(&self, msg: RoutedMessage) {
        let Some(store) = self.ctx.store.as_ref() else {
            return;
        };
        match msg.status {
            MessageStatus::Success => {
                let Some(data) = msg.data.as_deref() else {
                    debug!(address = %msg.address, "Subscriber message without data ignored");
                    return;
                };
                let record: SubscriberRecord = match serde_json::from_slice(data) {
                    Ok(record) => record,
                    Err(e) => {
                        error!(address = %msg.address, error = %e, "Failed to decode subscriber record");
                        return;
                    }
                };
                let client_id = record.client_id;
                let node = &self.ctx.node;
                match store
                    .upsert(vec![record], &node.node_name, &node.namespace)
                    .await
                {
                    Ok(()) => info!(client_id = %client_id, node = %node.node_name, "Subscriber persisted"),
                    Err(e) => error!(client_id = %client_id, error = %e, "Failed to persist subscriber"),
                }
            }
            MessageStatus::Delete => match msg.client_id {
                Some(client_id) => self.lifecycle.cleanup_store(client_id).await,
                None => warn!(address = %msg.address, "Subscriber DELETE without client id ignored"),
            },
            other => debug!(address = %msg.address, status = %other, "Subscriber message ignored"),
        }
    }
}
