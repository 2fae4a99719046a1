//! Error types for the dispatch subsystem and its ports.

use thiserror::Error;

/// Boxed error keeping the transport's source chain for classification.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by the REST delivery port.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The client gave up waiting for a response.
    #[error("request to {uri} timed out")]
    Timeout { uri: String },

    /// The connection could not be established.
    #[error("connection to {uri} failed: {source}")]
    Connect {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// The request failed after the connection was made, or for another
    /// transport reason.
    #[error("request to {uri} failed: {source}")]
    Request {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// The endpoint answered with a status the caller does not accept.
    #[error("{uri} returned HTTP {status}")]
    UnexpectedStatus { uri: String, status: u16 },

    /// The endpoint URI cannot be used.
    #[error("invalid endpoint {uri}: {message}")]
    InvalidEndpoint { uri: String, message: String },

    /// The payload could not be serialized.
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

impl DeliveryError {
    pub fn connect(uri: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connect {
            uri: uri.into(),
            source: source.into(),
        }
    }

    pub fn request(uri: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Request {
            uri: uri.into(),
            source: source.into(),
        }
    }

    pub fn timeout(uri: impl Into<String>) -> Self {
        Self::Timeout { uri: uri.into() }
    }
}

/// Failure reported by a registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("subscriber registry unavailable: {0}")]
    Unavailable(String),

    #[error("failed to persist registry state: {0}")]
    Persistence(String),
}

/// Failure reported by the durable subscription store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("subscription store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("subscription snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("subscription store not initialized: {0}")]
    NotInitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_connect_error_keeps_source() {
        let err = DeliveryError::connect(
            "http://consumer:9089/event",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        let source = err.source().expect("source");
        assert!(source.downcast_ref::<io::Error>().is_some());
        assert_eq!(
            err.to_string(),
            "connection to http://consumer:9089/event failed: refused"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = DeliveryError::timeout("http://consumer:9089/event");
        assert_eq!(err.to_string(), "request to http://consumer:9089/event timed out");
    }
}
