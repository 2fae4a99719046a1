//! # Subscriber Lifecycle Policy
//!
//! Turns repeated connectivity failures into subscription deletion. Counter
//! storage and the threshold belong to the [`SubscriberRegistry`]; this
//! service only calls into it, never across a network call.

use shared_types::{ClientId, SubscriberRecord};
use tracing::{error, info, warn};

use crate::domain::SubscriberHealth;
use crate::ports::outbound::SubscriberRegistry;
use crate::service::context::DispatchContext;

/// What a connectivity failure did to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Still registered; `remaining` failures before removal.
    Degraded { remaining: u32 },
    /// Threshold reached and `deleted` subscriptions removed.
    Removed { deleted: usize },
    /// Threshold reached but the registry refused the deletion.
    RemovalFailed,
}

/// Escalation of failing subscribers.
#[derive(Debug, Clone)]
pub struct SubscriberLifecycle {
    ctx: DispatchContext,
}

impl SubscriberLifecycle {
    pub fn new(ctx: DispatchContext) -> Self {
        Self { ctx }
    }

    /// Current health of `client_id`.
    pub fn health(&self, client_id: ClientId) -> SubscriberHealth {
        let registry = &self.ctx.subscribers;
        SubscriberHealth::from_count(
            registry.failure_count(client_id),
            registry.failure_threshold(),
        )
    }

    /// A delivery to `client_id` went through; it is healthy again.
    pub fn record_success(&self, client_id: ClientId) {
        self.ctx.subscribers.reset_failure_count(client_id);
    }

    /// Apply one classified connectivity failure for `client_id`.
    pub async fn record_connectivity_failure(
        &self,
        client_id: ClientId,
        address: &str,
    ) -> LifecycleOutcome {
        let registry = &self.ctx.subscribers;
        if !registry.increment_failure_and_check_threshold(client_id) {
            let failures = registry.failure_count(client_id);
            let threshold = registry.failure_threshold();
            let remaining = threshold.saturating_sub(failures);
            error!(
                client_id = %client_id,
                address = %address,
                failures,
                remaining,
                "Subscriber endpoint unreachable, will be removed after {} more failures",
                remaining
            );
            return LifecycleOutcome::Degraded { remaining };
        }

        warn!(
            client_id = %client_id,
            address = %address,
            threshold = registry.failure_threshold(),
            "Failure threshold reached, deleting all subscriptions for client"
        );
        match registry.delete_all_subscriptions(client_id) {
            Ok(deleted) => {
                self.ctx
                    .metrics
                    .adjust_active_subscriptions(-(deleted as i64));
                info!(client_id = %client_id, deleted, "Deleted subscriptions of unreachable client");
                self.cleanup_store(client_id).await;
                LifecycleOutcome::Removed { deleted }
            }
            Err(e) => {
                error!(
                    client_id = %client_id,
                    error = %e,
                    "Failed to delete subscriptions of unreachable client"
                );
                LifecycleOutcome::RemovalFailed
            }
        }
    }

    /// Write a DELETE record for `client_id` to the durable store.
    ///
    /// No-op in ephemeral mode. Failures are logged, never retried.
    pub async fn cleanup_store(&self, client_id: ClientId) {
        let Some(store) = self.ctx.store.as_ref() else {
            return;
        };
        let node = &self.ctx.node;
        match store
            .upsert(
                vec![SubscriberRecord::deletion(client_id)],
                &node.node_name,
                &node.namespace,
            )
            .await
        {
            Ok(()) => info!(
                client_id = %client_id,
                node = %node.node_name,
                "Removed client from subscription store"
            ),
            Err(e) => error!(
                client_id = %client_id,
                node = %node.node_name,
                error = %e,
                "Failed to remove client from subscription store"
            ),
        }
    }
}
