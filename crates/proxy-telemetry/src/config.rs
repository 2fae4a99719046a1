//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name reported at startup
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or directives
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "cloud-event-proxy".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CEP_SERVICE_NAME`: Service name (default: cloud-event-proxy)
    /// - `CEP_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `CEP_JSON_LOGS`: Enable JSON logs (default: false locally, true in Kubernetes)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let in_cluster = lookup("KUBERNETES_SERVICE_HOST").is_some();

        Self {
            service_name: lookup("CEP_SERVICE_NAME")
                .unwrap_or_else(|| "cloud-event-proxy".to_string()),

            log_level: lookup("CEP_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("CEP_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(in_cluster),
        }
    }
}
