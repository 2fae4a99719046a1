//! Outbound ports (SPI) for the dispatch subsystem.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use shared_types::{ClientId, CloudEvent, PubSubRecord, SubscriberRecord};

use crate::errors::{DeliveryError, RegistryError, StoreError};

/// Publisher and legacy single-endpoint subscription lookup.
pub trait PubSubRegistry: Send + Sync {
    /// Publisher registered for `address`.
    fn has_publisher(&self, address: &str) -> Option<PubSubRecord>;

    /// Legacy subscription registered for `address`.
    fn has_subscription(&self, address: &str) -> Option<PubSubRecord>;
}

/// Multi-subscriber registry with per-client failure tracking.
///
/// Implementations must make every operation atomic: the registry is shared
/// between dispatch iterations and API-triggered subscription changes.
pub trait SubscriberRegistry: Send + Sync {
    /// Clients subscribed to `address` and their endpoints.
    fn subscribers_by_resource(&self, address: &str) -> HashMap<ClientId, Option<String>>;

    /// Record one failure; `true` once the count reaches the threshold.
    fn increment_failure_and_check_threshold(&self, client_id: ClientId) -> bool;

    /// Forget all failures of `client_id`.
    fn reset_failure_count(&self, client_id: ClientId);

    /// Current consecutive failure count.
    fn failure_count(&self, client_id: ClientId) -> u32;

    /// Count at which a client is removed.
    fn failure_threshold(&self) -> u32;

    /// Delete every subscription of `client_id`, returning how many existed.
    ///
    /// Deleting an unknown client succeeds with zero.
    fn delete_all_subscriptions(&self, client_id: ClientId) -> Result<usize, RegistryError>;
}

/// HTTP delivery to subscriber and publisher endpoints.
#[async_trait]
pub trait RestDelivery: Send + Sync {
    /// POST raw bytes, returning the response status.
    async fn post(&self, uri: &str, body: Vec<u8>) -> Result<u16, DeliveryError>;

    /// POST a structured event; any non-2xx status is an error.
    async fn post_event(&self, uri: &str, event: &CloudEvent) -> Result<(), DeliveryError>;

    /// POST encoded CloudEvent bytes, returning the response status.
    async fn post_cloud_event(&self, uri: &str, raw: Vec<u8>) -> Result<u16, DeliveryError>;
}

/// Durable projection of active subscribers (optional backend).
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Apply `records` to the snapshot of `node_name` in `namespace`.
    async fn upsert(
        &self,
        records: Vec<SubscriberRecord>,
        node_name: &str,
        namespace: &str,
    ) -> Result<(), StoreError>;
}

/// Result label for metric updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters updated by the dispatcher.
pub trait MetricsSink: Send + Sync {
    /// An event for `address` was delivered or failed to be.
    fn event_received(&self, address: &str, outcome: Outcome);

    /// A publisher acknowledgement for `address` was processed.
    fn event_acknowledged(&self, address: &str, outcome: Outcome);

    /// A status acknowledgement for `address` was processed.
    fn status_acknowledged(&self, address: &str, outcome: Outcome);

    /// Adjust the active subscription gauge.
    fn adjust_active_subscriptions(&self, delta: i64);
}
