//! # Cloud Event Proxy
//!
//! Sidecar entry point.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and register metrics
//! 2. Parse flags and environment, refuse the retired v1 API
//! 3. Build the runtime (storage mode, registries, REST client)
//! 4. Install signal handlers
//! 5. Run until SIGINT, SIGTERM, SIGHUP or SIGQUIT

use anyhow::{Context, Result};
use clap::Parser;
use proxy_runtime::signals::wait_for_termination;
use proxy_runtime::{ProxyConfig, ProxyRuntime};
use proxy_telemetry::{init_logging, register_metrics, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("failed to initialize logging")?;
    register_metrics().context("failed to register metrics")?;

    let config = ProxyConfig::parse();
    config.validate().context("invalid configuration")?;
    info!(
        api_version = %config.api_version,
        api_port = config.api_port,
        store_path = %config.store_path.display(),
        metrics_addr = %config.metrics_addr,
        "Starting cloud event proxy"
    );

    let runtime = ProxyRuntime::new(config)
        .await
        .context("failed to build runtime")?;

    let shutdown = runtime.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = wait_for_termination(shutdown.clone()).await {
            error!(error = %e, "Failed to install signal handlers, shutting down");
            shutdown.trigger();
        }
    });

    runtime.run().await.context("runtime failed")?;
    info!("Exiting");
    Ok(())
}
