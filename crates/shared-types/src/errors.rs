//! # Error Types
//!
//! Errors raised while decoding or encoding shared entities.

use thiserror::Error;

/// Errors converting between raw bytes and a [`crate::CloudEvent`].
#[derive(Debug, Error)]
pub enum EventError {
    /// Payload is not a JSON CloudEvent.
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required CloudEvent context attribute is empty.
    #[error("Missing required event attribute: {0}")]
    MissingAttribute(&'static str),
}
