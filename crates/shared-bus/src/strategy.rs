//! # Producer Strategies
//!
//! Producers may attach custom handling to a [`crate::RoutedMessage`]. A
//! strategy supplied by the caller always wins over default routing.

use async_trait::async_trait;
use shared_types::CloudEvent;
use thiserror::Error;

use crate::message::RoutedMessage;

/// Error reported by a producer-supplied strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Custom handling for a NEW event, replacing delivery to subscribers.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Handle the decoded event.
    async fn process(&self, event: &CloudEvent) -> Result<(), HandlerError>;
}

/// Hook used by the inbound fallback loop to shape the echoed message.
pub trait ReceiveOverride: Send + Sync {
    /// Inspect the inbound payload and mutate the outbound message.
    ///
    /// An error downgrades the echoed status to FAILED.
    fn on_receive(&self, data: &[u8], out: &mut RoutedMessage) -> Result<(), HandlerError>;
}
