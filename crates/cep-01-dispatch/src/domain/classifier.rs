//! Failure classification for delivery errors.
//!
//! Only connectivity failures feed the subscriber lifecycle: the endpoint's
//! host does not resolve, the client timed out waiting for it, or it
//! actively refused the connection. Everything else is transient.

use std::error::Error;
use std::fmt;
use std::io;

use crate::errors::DeliveryError;

/// Messages the resolver stack puts on host lookup failures.
const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "no such host",
    "name or service not known",
    "nodename nor servname",
];

/// Why a delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// Host name could not be resolved.
    UnreachableHost,
    /// Deadline exceeded while awaiting the response.
    Timeout,
    /// Remote host refused the connection.
    ConnectionRefused,
    /// Any other failure.
    Other,
}

impl FailureCause {
    /// Whether the endpoint itself looks unreachable.
    pub fn is_connectivity(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnreachableHost => "unreachable_host",
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection_refused",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Classify a delivery error.
pub fn classify(error: &DeliveryError) -> FailureCause {
    match error {
        DeliveryError::Timeout { .. } => FailureCause::Timeout,
        DeliveryError::Connect { source, .. } | DeliveryError::Request { source, .. } => {
            let root: &(dyn Error + 'static) = &**source;
            classify_chain(root)
        }
        DeliveryError::UnexpectedStatus { .. }
        | DeliveryError::InvalidEndpoint { .. }
        | DeliveryError::Encode(_) => FailureCause::Other,
    }
}

/// Walk an error's source chain looking for a connectivity cause.
pub fn classify_chain(error: &(dyn Error + 'static)) -> FailureCause {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return FailureCause::ConnectionRefused,
                io::ErrorKind::TimedOut => return FailureCause::Timeout,
                _ => {}
            }
        }

        let message = err.to_string().to_ascii_lowercase();
        if DNS_MARKERS.iter().any(|marker| message.contains(marker)) {
            return FailureCause::UnreachableHost;
        }
        if message.contains("connection refused") {
            return FailureCause::ConnectionRefused;
        }

        current = err.source();
    }
    FailureCause::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    /// Stand-in for an HTTP client error wrapping a lower-level cause.
    #[derive(Debug, Error)]
    #[error("error sending request")]
    struct Wrapped(#[source] io::Error);

    const URI: &str = "http://consumer-events-subscription-service:9043/event";

    #[test]
    fn test_timeout_is_connectivity() {
        let cause = classify(&DeliveryError::timeout(URI));
        assert_eq!(cause, FailureCause::Timeout);
        assert!(cause.is_connectivity());
    }

    #[test]
    fn test_connection_refused_in_chain() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connect");
        let err = DeliveryError::connect(URI, Wrapped(io_err));
        assert_eq!(classify(&err), FailureCause::ConnectionRefused);
    }

    #[test]
    fn test_dns_failure_detected_by_message() {
        let io_err = io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        );
        let err = DeliveryError::connect(URI, Wrapped(io_err));
        assert_eq!(classify(&err), FailureCause::UnreachableHost);
    }

    #[test]
    fn test_io_timeout_in_chain() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "deadline has elapsed");
        let err = DeliveryError::request(URI, Wrapped(io_err));
        assert_eq!(classify(&err), FailureCause::Timeout);
    }

    #[test]
    fn test_connection_reset_is_not_connectivity() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let err = DeliveryError::request(URI, Wrapped(io_err));
        let cause = classify(&err);
        assert_eq!(cause, FailureCause::Other);
        assert!(!cause.is_connectivity());
    }

    #[test]
    fn test_status_and_encoding_errors_are_other() {
        let status = DeliveryError::UnexpectedStatus {
            uri: URI.to_string(),
            status: 500,
        };
        assert_eq!(classify(&status), FailureCause::Other);
        assert_eq!(
            classify(&DeliveryError::Encode("bad".to_string())),
            FailureCause::Other
        );
    }

    #[test]
    fn test_plain_message_refused() {
        let err = DeliveryError::connect(URI, "tcp connect error: Connection refused (os error 111)");
        assert_eq!(classify(&err), FailureCause::ConnectionRefused);
    }
}
