//! # Outbound Dispatch Subsystem (cep-01)
//!
//! Drains the outbound Event Bus queue, routes every message by type and
//! status, delivers events to subscribers over HTTP and escalates endpoints
//! that keep failing toward removal.
//!
//! ## Architecture Role
//!
//! ```text
//! [event_out queue] ──→ OutboundDispatcher ──RestDelivery──→ subscriber endpoints
//!                              │      ↑
//!                   classify() │      │ reset on success
//!                              ↓      │
//!                       SubscriberLifecycle ──delete──→ SubscriberRegistry
//!                              │
//!                              └──DELETE record──→ SubscriptionStore (durable mode)
//! ```
//!
//! When the transport is disabled, [`InboundFallbackLoop`] echoes inbound
//! requests onto the outbound queue instead.
//!
//! ## Error Policy
//!
//! No error raised while handling one message leaves the loop: it is logged
//! and, where relevant, counted through the [`MetricsSink`]. Only the shutdown
//! signal stops a loop.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapters::{InMemoryPubSubRegistry, InMemorySubscriberRegistry};
pub use domain::{classify, classify_chain, FailureCause, SubscriberHealth};
pub use errors::{BoxError, DeliveryError, RegistryError, StoreError};
pub use ports::outbound::{
    MetricsSink, Outcome, PubSubRegistry, RestDelivery, SubscriberRegistry, SubscriptionStore,
};
pub use service::{
    DispatchContext, InboundFallbackLoop, LifecycleOutcome, NodeIdentity, OutboundDispatcher,
    SubscriberLifecycle,
};

/// Consecutive connectivity failures after which a subscriber is removed.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 10;
