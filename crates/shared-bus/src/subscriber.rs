//! # Event Receivers
//!
//! Defines the consuming side of the event bus.

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::{RoutedMessage, StatusRequest};

/// Receiving ends of an [`crate::InMemoryEventBus`], handed to the loops.
pub struct BusReceivers {
    /// Messages arriving from the transport.
    pub event_in: EventReceiver,
    /// Messages for the outbound dispatcher.
    pub event_out: EventReceiver,
    /// Status requests.
    pub status: mpsc::Receiver<StatusRequest>,
}

/// Single-consumer handle on one event queue.
pub struct EventReceiver {
    receiver: mpsc::Receiver<RoutedMessage>,
}

impl EventReceiver {
    pub(crate) fn new(receiver: mpsc::Receiver<RoutedMessage>) -> Self {
        Self { receiver }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message in queue order
    /// - `None` - Every sender was dropped
    pub async fn recv(&mut self) -> Option<RoutedMessage> {
        let msg = self.receiver.recv().await;
        if msg.is_none() {
            debug!("Event queue closed");
        }
        msg
    }

    /// Take the next message without waiting.
    pub fn try_recv(&mut self) -> Option<RoutedMessage> {
        self.receiver.try_recv().ok()
    }
}

impl From<mpsc::Receiver<RoutedMessage>> for EventReceiver {
    fn from(receiver: mpsc::Receiver<RoutedMessage>) -> Self {
        Self::new(receiver)
    }
}
