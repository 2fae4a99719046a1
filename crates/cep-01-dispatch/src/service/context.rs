//! Collaborators shared by the dispatch services for the process lifetime.

use std::fmt;
use std::sync::Arc;

use crate::ports::outbound::{
    MetricsSink, PubSubRegistry, RestDelivery, SubscriberRegistry, SubscriptionStore,
};

/// Node and namespace the durable snapshot is written for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_name: String,
    pub namespace: String,
}

impl NodeIdentity {
    pub fn new(node_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Explicitly constructed dispatch state.
///
/// Built once at startup and cloned into every loop; clones share the same
/// collaborators.
#[derive(Clone)]
pub struct DispatchContext {
    pub pubsub: Arc<dyn PubSubRegistry>,
    pub subscribers: Arc<dyn SubscriberRegistry>,
    pub rest: Arc<dyn RestDelivery>,
    pub metrics: Arc<dyn MetricsSink>,
    /// Present only when the durable storage mode is active.
    pub store: Option<Arc<dyn SubscriptionStore>>,
    pub node: NodeIdentity,
}

impl DispatchContext {
    /// Context running in ephemeral storage mode.
    pub fn new(
        pubsub: Arc<dyn PubSubRegistry>,
        subscribers: Arc<dyn SubscriberRegistry>,
        rest: Arc<dyn RestDelivery>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            pubsub,
            subscribers,
            rest,
            metrics,
            store: None,
            node: NodeIdentity::default(),
        }
    }

    /// Switch to durable storage mode.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SubscriptionStore>, node: NodeIdentity) -> Self {
        self.store = Some(store);
        self.node = node;
        self
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_some()
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("durable", &self.is_durable())
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
