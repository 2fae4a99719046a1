//! # Cloud Event Proxy Runtime
//!
//! The sidecar process around the dispatch core.
//!
//! ## Modules
//!
//! - `config` - Flags, API version gate, transport host parsing
//! - `adapters` - Prometheus metrics sink, file-backed subscription store
//! - `server` - `/metrics` HTTP endpoint
//! - `signals` - Termination signal handling
//! - `runtime` - Loop wiring and storage mode selection

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod runtime;
pub mod server;
pub mod signals;

pub use adapters::{FileSubscriptionStore, PrometheusMetrics, StoreInit};
pub use config::{
    is_v1_api, major_version, metrics_bind_addr, sanitize_transport_host, ConfigError,
    ProxyConfig, TransportHost, TransportKind,
};
pub use runtime::{Inbound, ProxyRuntime, RuntimeError, StorageMode};
