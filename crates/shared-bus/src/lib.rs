//! # Shared Bus - Event Bus between Transport and Dispatcher
//!
//! Typed, bounded, in-process queues carrying [`RoutedMessage`]s. The bus is
//! pure data plane: producers enqueue, a single loop per queue dequeues.
//!
//! ```text
//!  transport ──publish_in()──→ [event_in] ──→ inbound fallback (transport off)
//!                                                   │
//!  plugins / API ──publish_out()──→ [event_out] ←───┘
//!                                       │
//!                                       ↓
//!                              outbound dispatcher
//! ```
//!
//! Every loop also observes the process-wide [`Shutdown`] signal.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod message;
pub mod publisher;
pub mod shutdown;
pub mod strategy;
pub mod subscriber;

// Re-export main types
pub use message::{MessageStatus, MessageType, RoutedMessage, StatusRequest};
pub use publisher::{BusConfig, BusError, EventPublisher, InMemoryEventBus};
pub use shutdown::{Shutdown, ShutdownListener};
pub use strategy::{EventProcessor, HandlerError, ReceiveOverride};
pub use subscriber::{BusReceivers, EventReceiver};

/// Default capacity of the inbound and outbound event queues.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Default capacity of the status request queue.
pub const DEFAULT_STATUS_CHANNEL_CAPACITY: usize = 50;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 100);
        assert_eq!(DEFAULT_STATUS_CHANNEL_CAPACITY, 50);
    }
}
