//! # REST Delivery Client (cep-02)
//!
//! Implements the [`RestDelivery`] port on top of a pooled `reqwest` client.
//!
//! Transport failures keep the full `reqwest` error as their source so the
//! dispatcher's classifier can walk down to the underlying I/O or resolver
//! error:
//!
//! | reqwest error      | [`DeliveryError`]     |
//! |--------------------|-----------------------|
//! | `is_timeout()`     | `Timeout`             |
//! | `is_connect()`     | `Connect`             |
//! | `is_builder()`     | `InvalidEndpoint`     |
//! | anything else      | `Request`             |

use std::time::Duration;

use async_trait::async_trait;
use cep_01_dispatch::{DeliveryError, RestDelivery};
use reqwest::header::CONTENT_TYPE;
use shared_types::CloudEvent;
use tracing::{debug, warn};

/// Media type of plain JSON bodies (acknowledgements, legacy events).
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Media type of structured-mode CloudEvents.
pub const CLOUD_EVENT_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Timeouts of the delivery client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for the whole request.
    pub timeout: Duration,
    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
        }
    }
}

/// REST delivery client shared by every dispatch iteration.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl RestClient {
    /// Build a client with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> ClientConfig {
        self.config
    }

    async fn send(
        &self,
        uri: &str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> Result<u16, DeliveryError> {
        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| map_error(uri, e))?;

        let status = response.status().as_u16();
        debug!(endpoint = %uri, status, "POST completed");
        Ok(status)
    }
}

fn map_error(uri: &str, error: reqwest::Error) -> DeliveryError {
    warn!(endpoint = %uri, error = %error, "POST failed");
    if error.is_timeout() {
        DeliveryError::timeout(uri)
    } else if error.is_connect() {
        DeliveryError::connect(uri, error)
    } else if error.is_builder() {
        DeliveryError::InvalidEndpoint {
            uri: uri.to_string(),
            message: error.to_string(),
        }
    } else {
        DeliveryError::request(uri, error)
    }
}

#[async_trait]
impl RestDelivery for RestClient {
    async fn post(&self, uri: &str, body: Vec<u8>) -> Result<u16, DeliveryError> {
        self.send(uri, JSON_CONTENT_TYPE, body).await
    }

    async fn post_event(&self, uri: &str, event: &CloudEvent) -> Result<(), DeliveryError> {
        let body = event
            .to_bytes()
            .map_err(|e| DeliveryError::Encode(e.to_string()))?;
        match self.send(uri, JSON_CONTENT_TYPE, body).await? {
            status if (200..300).contains(&status) => Ok(()),
            status => Err(DeliveryError::UnexpectedStatus {
                uri: uri.to_string(),
                status,
            }),
        }
    }

    async fn post_cloud_event(&self, uri: &str, raw: Vec<u8>) -> Result<u16, DeliveryError> {
        self.send(uri, CLOUD_EVENT_CONTENT_TYPE, raw).await
    }
}
