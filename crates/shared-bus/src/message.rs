//! # Routed Messages
//!
//! The unit flowing through the Event Bus. `message_type` and `status`
//! together decide how `data` must be interpreted:
//!
//! | Type       | Status            | `data`                              |
//! |------------|-------------------|-------------------------------------|
//! | EVENT      | NEW               | CloudEvent bytes (required)         |
//! | EVENT      | SUCCESS / FAILED  | CloudEvent bytes, ack for publisher |
//! | STATUS     | any               | unused                              |
//! | SUBSCRIBER | SUCCESS           | subscriber record JSON              |
//! | SUBSCRIBER | DELETE            | unused, `client_id` is the target   |

use std::fmt;
use std::sync::Arc;

use shared_types::ClientId;

use crate::strategy::{EventProcessor, ReceiveOverride};

/// Kind of routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Event,
    Status,
    Subscriber,
    Publisher,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "EVENT",
            Self::Status => "STATUS",
            Self::Subscriber => "SUBSCRIBER",
            Self::Publisher => "PUBLISHER",
        };
        f.write_str(name)
    }
}

/// Processing status of a routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    New,
    Success,
    Failed,
    Delete,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message on the Event Bus.
#[derive(Clone)]
pub struct RoutedMessage {
    pub message_type: MessageType,
    pub status: MessageStatus,
    /// Resource path identifying the topic or endpoint.
    pub address: String,
    /// Subscriber the message concerns, for SUBSCRIBER messages.
    pub client_id: Option<ClientId>,
    /// Serialized event or subscriber record.
    pub data: Option<Vec<u8>>,
    /// Producer-owned event handling; bypasses subscriber routing.
    pub process_event: Option<Arc<dyn EventProcessor>>,
    /// Producer hook for the inbound fallback echo.
    pub on_receive_override: Option<Arc<dyn ReceiveOverride>>,
}

impl RoutedMessage {
    pub fn new(message_type: MessageType, status: MessageStatus, address: impl Into<String>) -> Self {
        Self {
            message_type,
            status,
            address: address.into(),
            client_id: None,
            data: None,
            process_event: None,
            on_receive_override: None,
        }
    }

    /// A NEW event for `address` carrying encoded CloudEvent bytes.
    pub fn event(address: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(MessageType::Event, MessageStatus::New, address).with_data(data)
    }

    /// A status acknowledgement for `address`.
    pub fn status(address: impl Into<String>, status: MessageStatus) -> Self {
        Self::new(MessageType::Status, status, address)
    }

    /// A subscriber lifecycle message for `client_id`.
    pub fn subscriber(
        address: impl Into<String>,
        client_id: ClientId,
        status: MessageStatus,
    ) -> Self {
        let mut msg = Self::new(MessageType::Subscriber, status, address);
        msg.client_id = Some(client_id);
        msg
    }

    #[must_use]
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn EventProcessor>) -> Self {
        self.process_event = Some(processor);
        self
    }

    #[must_use]
    pub fn with_override(mut self, hook: Arc<dyn ReceiveOverride>) -> Self {
        self.on_receive_override = Some(hook);
        self
    }
}

impl fmt::Debug for RoutedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedMessage")
            .field("message_type", &self.message_type)
            .field("status", &self.status)
            .field("address", &self.address)
            .field("client_id", &self.client_id)
            .field("data_len", &self.data.as_ref().map(Vec::len))
            .field("process_event", &self.process_event.is_some())
            .field("on_receive_override", &self.on_receive_override.is_some())
            .finish()
    }
}

/// Status query carried on the secondary status queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub client_id: Option<ClientId>,
    pub address: String,
}
