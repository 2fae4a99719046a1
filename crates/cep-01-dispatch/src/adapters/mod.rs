//! In-process adapters for the registry ports.

mod memory;

pub use memory::{InMemoryPubSubRegistry, InMemorySubscriberRegistry};
