//! # Metrics Server
//!
//! Serves `GET /metrics` in Prometheus text format. Bind or serve failures
//! are retried on a fixed interval until shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use proxy_telemetry::encode_metrics;
use shared_bus::ShutdownListener;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Delay between metrics listener restarts.
pub const METRICS_RETRY_INTERVAL: Duration = Duration::from_secs(5);

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> Response {
    match encode_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve metrics on an already bound listener until shutdown.
pub async fn serve_metrics(
    listener: TcpListener,
    mut shutdown: ShutdownListener,
) -> std::io::Result<()> {
    axum::serve(listener, metrics_router())
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// Bind `addr` and serve metrics, restarting after `retry` on failure.
pub async fn run_metrics_server(addr: SocketAddr, shutdown: ShutdownListener, retry: Duration) {
    let mut stop = shutdown.clone();
    loop {
        let attempt = async {
            let listener = TcpListener::bind(addr).await?;
            info!(address = %addr, "Metrics server listening");
            serve_metrics(listener, shutdown.clone()).await
        };
        tokio::select! {
            biased;
            _ = stop.wait() => break,
            result = attempt => match result {
                Ok(()) => break,
                Err(e) => error!(address = %addr, error = %e, "Metrics server failed, restarting"),
            },
        }
        tokio::select! {
            _ = stop.wait() => break,
            _ = tokio::time::sleep(retry) => {}
        }
    }
    info!("Metrics server stopped");
}
