//! Cross-crate integration scenarios.

pub mod delivery_flows;
pub mod durable_flows;

#[cfg(test)]
pub(crate) mod support {
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use cep_02_rest_client::{ClientConfig, RestClient};
    use shared_types::CloudEvent;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// Bodies received per route name.
    #[derive(Default)]
    pub struct Consumer {
        bodies: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    }

    impl Consumer {
        pub async fn bodies(&self, route: &str) -> Vec<Vec<u8>> {
            self.bodies
                .lock()
                .await
                .get(route)
                .cloned()
                .unwrap_or_default()
        }

        pub async fn events(&self, route: &str) -> Vec<CloudEvent> {
            self.bodies(route)
                .await
                .iter()
                .map(|b| CloudEvent::from_bytes(b).expect("cloud event body"))
                .collect()
        }
    }

    async fn accept(
        State(consumer): State<Arc<Consumer>>,
        Path(route): Path<String>,
        body: Bytes,
    ) -> StatusCode {
        consumer
            .bodies
            .lock()
            .await
            .entry(route.clone())
            .or_default()
            .push(body.to_vec());
        match route.as_str() {
            "broken" => StatusCode::INTERNAL_SERVER_ERROR,
            "ack" => StatusCode::OK,
            _ => StatusCode::NO_CONTENT,
        }
    }

    async fn slow() -> StatusCode {
        tokio::time::sleep(Duration::from_millis(500)).await;
        StatusCode::NO_CONTENT
    }

    /// Loopback consumer: `/slow` stalls, `/broken` answers 500, `/ack`
    /// answers 200 and every other `/{route}` answers 204.
    pub async fn consumer() -> (SocketAddr, Arc<Consumer>) {
        let consumer = Arc::new(Consumer::default());
        let app = Router::new()
            .route("/slow", post(slow))
            .route("/:route", post(accept))
            .with_state(consumer.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        (addr, consumer)
    }

    /// A loopback port with nothing listening on it.
    pub fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        port
    }

    pub fn rest_client(timeout: Duration) -> Arc<RestClient> {
        Arc::new(
            RestClient::new(ClientConfig {
                timeout,
                connect_timeout: Duration::from_secs(1),
            })
            .expect("client"),
        )
    }

    pub fn new_event(address: &str) -> Vec<u8> {
        CloudEvent::new(
            address,
            "event.sync.ptp-status.ptp-state-change",
            Some(serde_json::json!({"state": "HOLDOVER"})),
        )
        .to_bytes()
        .expect("encode")
    }
}
