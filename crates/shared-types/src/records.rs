//! # Subscription Records
//!
//! Records owned by the publisher/subscriber registries and the durable
//! store. The dispatcher only reads them, except for emitting deletion
//! records for subscribers it has condemned.

use serde::{Deserialize, Serialize};

use crate::ClientId;

/// A publisher, or a legacy single-endpoint subscription, bound to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubRecord {
    /// Publisher or subscription identifier.
    pub id: String,
    /// Resource address the record is bound to.
    pub resource: String,
    /// Endpoint that receives events or acknowledgements, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_uri: Option<String>,
}

impl PubSubRecord {
    pub fn new(
        id: impl Into<String>,
        resource: impl Into<String>,
        endpoint_uri: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource: resource.into(),
            endpoint_uri,
        }
    }
}

/// One resource subscription held by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    /// Subscription identifier.
    pub id: String,
    /// Subscribed resource address.
    pub resource: String,
}

/// What the durable store should do with a [`SubscriberRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriberAction {
    /// Insert or replace the subscriber's snapshot.
    #[default]
    Upsert,
    /// Remove the subscriber from the snapshot.
    Delete,
}

/// Subscriber descriptor as carried by SUBSCRIBER messages and persisted
/// by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRecord {
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_uri: Option<String>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionEntry>,
    #[serde(default)]
    pub action: SubscriberAction,
}

impl SubscriberRecord {
    /// Record instructing the store to drop every subscription of `client_id`.
    pub fn deletion(client_id: ClientId) -> Self {
        Self {
            client_id,
            endpoint_uri: None,
            subscriptions: Vec::new(),
            action: SubscriberAction::Delete,
        }
    }
}

/// Acknowledgement posted back to a publisher once its event was handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAck {
    pub event_id: String,
    pub status: String,
}
