//! In-memory registries.
//!
//! Thread-safe via `parking_lot::RwLock`; every port operation takes the
//! lock once, so increments, resets and deletions are atomic with respect
//! to each other.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::{ClientId, PubSubRecord, SubscriberRecord, SubscriptionEntry};
use tracing::debug;
use uuid::Uuid;

use crate::errors::RegistryError;
use crate::ports::outbound::{PubSubRegistry, SubscriberRegistry};
use crate::DEFAULT_FAILURE_THRESHOLD;

/// Publishers and legacy subscriptions keyed by resource address.
#[derive(Default)]
pub struct InMemoryPubSubRegistry {
    publishers: RwLock<HashMap<String, PubSubRecord>>,
    subscriptions: RwLock<HashMap<String, PubSubRecord>>,
}

impl InMemoryPubSubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the publisher for its resource.
    pub fn add_publisher(&self, record: PubSubRecord) {
        self.publishers.write().insert(record.resource.clone(), record);
    }

    /// Register (or replace) the legacy subscription for its resource.
    pub fn add_subscription(&self, record: PubSubRecord) {
        self.subscriptions
            .write()
            .insert(record.resource.clone(), record);
    }

    pub fn remove_subscription(&self, address: &str) -> Option<PubSubRecord> {
        self.subscriptions.write().remove(address)
    }
}

impl PubSubRegistry for InMemoryPubSubRegistry {
    fn has_publisher(&self, address: &str) -> Option<PubSubRecord> {
        self.publishers.read().get(address).cloned()
    }

    fn has_subscription(&self, address: &str) -> Option<PubSubRecord> {
        self.subscriptions.read().get(address).cloned()
    }
}

#[derive(Debug, Clone, Default)]
struct ClientEntry {
    endpoint_uri: Option<String>,
    /// Subscription id → resource address.
    subscriptions: HashMap<String, String>,
}

#[derive(Default)]
struct SubscriberTable {
    clients: HashMap<ClientId, ClientEntry>,
    failures: HashMap<ClientId, u32>,
}

/// Multi-subscriber registry with failure counters.
pub struct InMemorySubscriberRegistry {
    table: RwLock<SubscriberTable>,
    threshold: u32,
}

impl InMemorySubscriberRegistry {
    /// Registry removing clients after `threshold` consecutive failures.
    pub fn new(threshold: u32) -> Self {
        Self {
            table: RwLock::new(SubscriberTable::default()),
            threshold: threshold.max(1),
        }
    }

    /// Subscribe `client_id` to `resource`, returning the subscription id.
    ///
    /// The client's endpoint is replaced when `endpoint_uri` is given.
    pub fn subscribe(
        &self,
        client_id: ClientId,
        endpoint_uri: Option<String>,
        resource: impl Into<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let mut table = self.table.write();
        let entry = table.clients.entry(client_id).or_default();
        if endpoint_uri.is_some() {
            entry.endpoint_uri = endpoint_uri;
        }
        entry.subscriptions.insert(id.clone(), resource.into());
        id
    }

    /// Replace a client's state from a persisted record; returns the number
    /// of subscriptions it now holds.
    pub fn restore(&self, record: &SubscriberRecord) -> usize {
        let subscriptions: HashMap<String, String> = record
            .subscriptions
            .iter()
            .map(|s| (s.id.clone(), s.resource.clone()))
            .collect();
        let count = subscriptions.len();
        self.table.write().clients.insert(
            record.client_id,
            ClientEntry {
                endpoint_uri: record.endpoint_uri.clone(),
                subscriptions,
            },
        );
        count
    }

    /// Snapshot of one client.
    pub fn client(&self, client_id: ClientId) -> Option<SubscriberRecord> {
        self.table.read().clients.get(&client_id).map(|entry| {
            let mut subscriptions: Vec<SubscriptionEntry> = entry
                .subscriptions
                .iter()
                .map(|(id, resource)| SubscriptionEntry {
                    id: id.clone(),
                    resource: resource.clone(),
                })
                .collect();
            subscriptions.sort_by(|a, b| a.id.cmp(&b.id));
            SubscriberRecord {
                client_id,
                endpoint_uri: entry.endpoint_uri.clone(),
                subscriptions,
                action: Default::default(),
            }
        })
    }

    /// Total subscriptions across all clients.
    pub fn subscription_count(&self) -> usize {
        self.table
            .read()
            .clients
            .values()
            .map(|c| c.subscriptions.len())
            .sum()
    }
}

impl Default for InMemorySubscriberRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

impl SubscriberRegistry for InMemorySubscriberRegistry {
    fn subscribers_by_resource(&self, address: &str) -> HashMap<ClientId, Option<String>> {
        self.table
            .read()
            .clients
            .iter()
            .filter(|(_, entry)| entry.subscriptions.values().any(|r| r == address))
            .map(|(id, entry)| (*id, entry.endpoint_uri.clone()))
            .collect()
    }

    fn increment_failure_and_check_threshold(&self, client_id: ClientId) -> bool {
        let mut table = self.table.write();
        let count = table.failures.entry(client_id).or_insert(0);
        *count = count.saturating_add(1);
        *count >= self.threshold
    }

    fn reset_failure_count(&self, client_id: ClientId) {
        self.table.write().failures.remove(&client_id);
    }

    fn failure_count(&self, client_id: ClientId) -> u32 {
        self.table
            .read()
            .failures
            .get(&client_id)
            .copied()
            .unwrap_or(0)
    }

    fn failure_threshold(&self) -> u32 {
        self.threshold
    }

    fn delete_all_subscriptions(&self, client_id: ClientId) -> Result<usize, RegistryError> {
        let mut table = self.table.write();
        table.failures.remove(&client_id);
        let removed = table
            .clients
            .remove(&client_id)
            .map(|entry| entry.subscriptions.len())
            .unwrap_or(0);
        debug!(client_id = %client_id, removed, "Deleted all subscriptions for client");
        Ok(removed)
    }
}
