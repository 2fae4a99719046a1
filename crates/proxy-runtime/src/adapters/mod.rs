//! Runtime-side adapters for the dispatch ports.

pub mod file_store;
pub mod metrics;

pub use file_store::{FileSubscriptionStore, StoreInit};
pub use metrics::PrometheusMetrics;
