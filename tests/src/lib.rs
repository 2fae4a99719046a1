//! # Cloud Event Proxy Test Suite
//!
//! Cross-crate scenarios that run the real dispatcher and REST client
//! against loopback HTTP endpoints.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── delivery_flows.rs   # fan-out, legacy and acknowledgement paths
//!     └── durable_flows.rs    # condemned subscribers and the file store
//! tests/benches/
//! └── dispatch_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p proxy-tests
//! cargo bench -p proxy-tests
//! ```

pub mod integration;
