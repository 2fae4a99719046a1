//! # Proxy Telemetry
//!
//! Logging and metrics for the cloud event proxy.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use proxy_telemetry::{init_logging, register_metrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! register_metrics()?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CEP_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `CEP_JSON_LOGS` | `true` in Kubernetes | JSON formatted logs |
//! | `CEP_SERVICE_NAME` | `cloud-event-proxy` | Service name in startup logs |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    adjust_subscription_gauge, encode_metrics, record_event_ack, record_event_received,
    record_status_check, register_metrics, API_SUBSCRIPTIONS, EVENTS_ACK, EVENTS_RECEIVED,
    REGISTRY, STATUS_CHECK_PUBLISHED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}
