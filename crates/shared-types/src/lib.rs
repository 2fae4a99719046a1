//! # Shared Types Crate
//!
//! Entities exchanged between the transport boundary, the dispatcher, the
//! registries and the durable subscription store.
//!
//! ## Contents
//!
//! - [`CloudEvent`]: the structured event carried as raw bytes on the bus
//! - [`PubSubRecord`]: a publisher or a legacy single-endpoint subscription
//! - [`SubscriberRecord`]: a subscriber descriptor as persisted by the store
//! - [`EventAck`]: acknowledgement payload posted back to publishers

pub mod errors;
pub mod event;
pub mod records;

pub use errors::*;
pub use event::{CloudEvent, CLOUD_EVENTS_SPEC_VERSION};
pub use records::*;

/// Opaque subscriber identifier used for failure tracking and deletion.
pub type ClientId = uuid::Uuid;
