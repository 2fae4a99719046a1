//! # Cloud Event
//!
//! Structured form of the event payloads that travel as raw bytes on the
//! Event Bus. Only the JSON structured-mode encoding is supported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::EventError;

/// CloudEvents specification version emitted by [`CloudEvent::new`].
pub const CLOUD_EVENTS_SPEC_VERSION: &str = "1.0";

/// A CloudEvent in JSON structured mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// CloudEvents specification version.
    #[serde(rename = "specversion")]
    pub spec_version: String,
    /// Event identifier, unique per source.
    pub id: String,
    /// Resource address that produced the event.
    pub source: String,
    /// Event type, e.g. `event.sync.ptp-status.ptp-state-change`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Time the event occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Media type of `data`.
    #[serde(
        rename = "datacontenttype",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_content_type: Option<String>,
    /// Schema that `data` adheres to.
    #[serde(rename = "dataschema", default, skip_serializing_if = "Option::is_none")]
    pub data_schema: Option<String>,
    /// Subject of the event in the context of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Binary payload, base64 encoded. Carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    /// Extension attributes, kept as received.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl CloudEvent {
    /// Create an event stamped with a fresh identifier and the current time.
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            spec_version: CLOUD_EVENTS_SPEC_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            time: Some(Utc::now()),
            data_content_type: data.as_ref().map(|_| "application/json".to_string()),
            data_schema: None,
            subject: None,
            data,
            data_base64: None,
            extensions: Map::new(),
        }
    }

    /// Decode an event from its JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Malformed`] if the bytes are not a JSON event, or
    /// [`EventError::MissingAttribute`] if `id`, `source` or `type` is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        let event: CloudEvent = serde_json::from_slice(bytes)?;
        event.validate()?;
        Ok(event)
    }

    /// Encode the event as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Render the event as a JSON string, used when an event is only logged.
    pub fn json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Copy of this event carrying a different identifier.
    #[must_use]
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<(), EventError> {
        if self.id.is_empty() {
            return Err(EventError::MissingAttribute("id"));
        }
        if self.source.is_empty() {
            return Err(EventError::MissingAttribute("source"));
        }
        if self.event_type.is_empty() {
            return Err(EventError::MissingAttribute("type"));
        }
        Ok(())
    }
}
