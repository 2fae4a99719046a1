//! # Proxy Configuration
//!
//! Command-line flags, each with an environment fallback, plus the helpers
//! that interpret them: API version gate, transport host sanitising and
//! parsing, metrics bind address.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use cep_01_dispatch::DEFAULT_FAILURE_THRESHOLD;
use cep_02_rest_client::ClientConfig;
use clap::Parser;
use reqwest::Url;
use thiserror::Error;

/// Transport host used when none is configured. `NODE_NAME` is replaced
/// with the node's name at startup.
pub const DEFAULT_TRANSPORT_HOST: &str =
    "http://ptp-event-publisher-service-NODE_NAME.openshift-ptp.svc.cluster.local:9043";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("REST API v1 is no longer supported, configured version {0}; use 2.0")]
    UnsupportedApiVersion(String),

    #[error("invalid API version {version}: {message}")]
    InvalidApiVersion { version: String, message: String },

    #[error("invalid metrics address {addr}: {message}")]
    InvalidMetricsAddr { addr: String, message: String },

    #[error("failure threshold must be at least 1")]
    InvalidThreshold,
}

/// Sidecar configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cloud-event-proxy",
    version,
    about = "Dispatches transport events to registered HTTP subscribers"
)]
pub struct ProxyConfig {
    /// The address the metric endpoint binds to.
    #[arg(long, env = "CEP_METRICS_ADDR", default_value = ":9091")]
    pub metrics_addr: String,

    /// The path to store publisher and subscription info.
    #[arg(long, env = "CEP_STORE_PATH", default_value = ".")]
    pub store_path: PathBuf,

    /// The transport bus hostname or service name.
    #[arg(long, env = "CEP_TRANSPORT_HOST", default_value = DEFAULT_TRANSPORT_HOST)]
    pub transport_host: String,

    /// The port the REST API endpoint binds to.
    #[arg(long, env = "CEP_API_PORT", default_value_t = 9043)]
    pub api_port: u16,

    /// The REST API version.
    #[arg(long, env = "CEP_API_VERSION", default_value = "2.0")]
    pub api_version: String,

    /// Consecutive connectivity failures before a subscriber is removed.
    #[arg(long, env = "CEP_FAILURE_THRESHOLD", default_value_t = DEFAULT_FAILURE_THRESHOLD)]
    pub failure_threshold: u32,

    /// Request deadline for subscriber deliveries, in milliseconds.
    #[arg(long, env = "CEP_REQUEST_TIMEOUT_MS", default_value_t = 2_000)]
    pub request_timeout_ms: u64,

    /// Connect deadline for subscriber deliveries, in milliseconds.
    #[arg(long, env = "CEP_CONNECT_TIMEOUT_MS", default_value_t = 1_000)]
    pub connect_timeout_ms: u64,

    /// IP of the node this sidecar runs on.
    #[arg(long, env = "NODE_IP", default_value = "")]
    pub node_ip: String,

    /// Name of the node this sidecar runs on.
    #[arg(long, env = "NODE_NAME", default_value = "")]
    pub node_name: String,

    /// Namespace of the durable subscription snapshot.
    #[arg(long = "namespace", env = "NAME_SPACE", default_value = "")]
    pub namespace: String,
}

impl ProxyConfig {
    /// Reject configurations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_v1_api(&self.api_version) {
            return Err(ConfigError::UnsupportedApiVersion(self.api_version.clone()));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        metrics_bind_addr(&self.metrics_addr)?;
        Ok(())
    }

    /// Transport host with node placeholders filled in, then parsed.
    pub fn transport(&self) -> TransportHost {
        TransportHost::parse(&sanitize_transport_host(
            &self.transport_host,
            &self.node_ip,
            &self.node_name,
        ))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_millis(self.request_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    /// Whether node and namespace allow a durable snapshot at all.
    pub fn has_node_identity(&self) -> bool {
        !self.node_name.is_empty() && !self.namespace.is_empty()
    }
}

/// Major component of an API version such as `v2.0`.
///
/// An empty version means v1.
pub fn major_version(version: &str) -> Result<u32, ConfigError> {
    if version.is_empty() {
        return Ok(1);
    }
    let trimmed = version.trim_start_matches(&['v', 'V'][..]);
    let major = trimmed.split('.').next().unwrap_or_default();
    major
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidApiVersion {
            version: version.to_string(),
            message: e.to_string(),
        })
}

/// Whether `version` selects the retired v1 REST API.
///
/// Unparseable versions count as v1.
pub fn is_v1_api(version: &str) -> bool {
    !matches!(major_version(version), Ok(major) if major >= 2)
}

/// Fill the `NODE_IP` and `NODE_NAME` placeholders of a transport host.
pub fn sanitize_transport_host(host: &str, node_ip: &str, node_name: &str) -> String {
    let mut host = host.to_string();
    if !node_ip.is_empty() {
        host = host.replace("NODE_IP", node_ip);
    }
    if !node_name.is_empty() {
        host = host.replace("NODE_NAME", node_name);
    }
    host
}

/// Resolve a listen address, host optional (`:9091`), to a socket address.
pub fn metrics_bind_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    full.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidMetricsAddr {
        addr: addr.to_string(),
        message: e.to_string(),
    })
}

/// Kind of transport the host designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Unknown,
}

/// Parsed transport host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHost {
    pub url: String,
    pub kind: TransportKind,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Why the host could not be used, when `kind` is `Unknown`.
    pub error: Option<String>,
}

impl TransportHost {
    pub fn parse(url: &str) -> Self {
        let unknown = |error: String| Self {
            url: url.to_string(),
            kind: TransportKind::Unknown,
            host: None,
            port: None,
            error: Some(error),
        };
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => match parsed.host_str() {
                Some(host) => Self {
                    url: url.to_string(),
                    kind: TransportKind::Http,
                    host: Some(host.to_string()),
                    port: parsed.port_or_known_default(),
                    error: None,
                },
                None => unknown(format!("transport host {url} has no host")),
            },
            Ok(parsed) => unknown(format!("unsupported transport scheme {}", parsed.scheme())),
            Err(e) => unknown(format!("invalid transport host {url}: {e}")),
        }
    }

    /// Whether events can be exchanged with the transport.
    pub fn is_enabled(&self) -> bool {
        self.kind == TransportKind::Http
    }
}
