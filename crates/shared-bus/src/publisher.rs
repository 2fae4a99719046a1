//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::message::{RoutedMessage, StatusRequest};
use crate::subscriber::{BusReceivers, EventReceiver};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_STATUS_CHANNEL_CAPACITY};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The receiving loop is gone.
    #[error("Event bus closed")]
    Closed,
}

/// Queue capacities of an [`InMemoryEventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Capacity of the inbound and outbound event queues.
    pub event_capacity: usize,
    /// Capacity of the status request queue.
    pub status_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            status_capacity: DEFAULT_STATUS_CHANNEL_CAPACITY,
        }
    }
}

/// Trait for publishing routed messages to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue a message coming from the transport boundary.
    ///
    /// Waits while the inbound queue is full.
    async fn publish_in(&self, msg: RoutedMessage) -> Result<(), BusError>;

    /// Enqueue a message for the outbound dispatcher.
    ///
    /// Waits while the outbound queue is full.
    async fn publish_out(&self, msg: RoutedMessage) -> Result<(), BusError>;

    /// Get the total number of messages published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses bounded `tokio::sync::mpsc` queues: many producers, one consumer per
/// queue, FIFO per queue. Cloning shares the same queues.
#[derive(Clone)]
pub struct InMemoryEventBus {
    event_in: mpsc::Sender<RoutedMessage>,
    event_out: mpsc::Sender<RoutedMessage>,
    status: mpsc::Sender<StatusRequest>,

    /// Total messages published.
    events_published: Arc<AtomicU64>,

    config: BusConfig,
}

impl InMemoryEventBus {
    /// Create a bus with default capacities, returning the receiving ends.
    #[must_use]
    pub fn new() -> (Self, BusReceivers) {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given capacities, returning the receiving ends.
    #[must_use]
    pub fn with_config(config: BusConfig) -> (Self, BusReceivers) {
        let (in_tx, in_rx) = mpsc::channel(config.event_capacity.max(1));
        let (out_tx, out_rx) = mpsc::channel(config.event_capacity.max(1));
        let (status_tx, status_rx) = mpsc::channel(config.status_capacity.max(1));

        let bus = Self {
            event_in: in_tx,
            event_out: out_tx,
            status: status_tx,
            events_published: Arc::new(AtomicU64::new(0)),
            config,
        };
        let receivers = BusReceivers {
            event_in: EventReceiver::new(in_rx),
            event_out: EventReceiver::new(out_rx),
            status: status_rx,
        };
        (bus, receivers)
    }

    /// Sender for the outbound queue, for loops that echo onto it.
    #[must_use]
    pub fn outbound_sender(&self) -> mpsc::Sender<RoutedMessage> {
        self.event_out.clone()
    }

    /// Enqueue a status request.
    pub async fn request_status(&self, request: StatusRequest) -> Result<(), BusError> {
        self.status.send(request).await.map_err(|_| BusError::Closed)
    }

    /// Get the configured capacities.
    #[must_use]
    pub fn config(&self) -> BusConfig {
        self.config
    }

    async fn send(
        &self,
        queue: &mpsc::Sender<RoutedMessage>,
        name: &'static str,
        msg: RoutedMessage,
    ) -> Result<(), BusError> {
        let message_type = msg.message_type;
        let address = msg.address.clone();

        // Always increment counter (publish was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match queue.send(msg).await {
            Ok(()) => {
                debug!(queue = name, message_type = %message_type, address = %address, "Message enqueued");
                Ok(())
            }
            Err(_) => {
                warn!(queue = name, message_type = %message_type, address = %address, "Message dropped (queue closed)");
                Err(BusError::Closed)
            }
        }
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish_in(&self, msg: RoutedMessage) -> Result<(), BusError> {
        self.send(&self.event_in, "event_in", msg).await
    }

    async fn publish_out(&self, msg: RoutedMessage) -> Result<(), BusError> {
        self.send(&self.event_out, "event_out", msg).await
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
