//! # Proxy Runtime
//!
//! Wires the Event Bus, the registries, the REST client and the dispatch
//! loops together for one sidecar process.
//!
//! ## Startup Sequence
//!
//! 1. Parse the transport host; an unusable host disables the transport
//! 2. Select the storage mode (durable only with node identity, HTTP
//!    transport and an initialised store)
//! 3. Restore persisted subscribers in durable mode
//! 4. Spawn the metrics server and, with the transport disabled, the
//!    inbound fallback loop
//! 5. Run the outbound dispatcher until shutdown

use std::fmt;
use std::sync::Arc;

use cep_01_dispatch::{
    DispatchContext, InMemoryPubSubRegistry, InMemorySubscriberRegistry, InboundFallbackLoop,
    MetricsSink, NodeIdentity, OutboundDispatcher, StoreError,
};
use cep_02_rest_client::RestClient;
use shared_bus::{
    BusReceivers, EventReceiver, InMemoryEventBus, Shutdown, ShutdownListener, StatusRequest,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::adapters::{FileSubscriptionStore, PrometheusMetrics, StoreInit};
use crate::config::{metrics_bind_addr, ConfigError, ProxyConfig, TransportHost};
use crate::server::{run_metrics_server, METRICS_RETRY_INTERVAL};

/// Where subscriber state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Registry only; lost on restart.
    EmptyDir,
    /// Registry mirrored to the file store.
    Durable,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDir => f.write_str("EmptyDir"),
            Self::Durable => f.write_str("Durable"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build REST client: {0}")]
    RestClient(#[from] reqwest::Error),

    #[error("failed to restore subscriptions: {0}")]
    Restore(#[from] StoreError),
}

/// Inbound side of the bus: events from producers and status requests.
pub struct Inbound {
    pub events: EventReceiver,
    pub status: mpsc::Receiver<StatusRequest>,
}

/// One sidecar process.
pub struct ProxyRuntime {
    config: ProxyConfig,
    transport: TransportHost,
    mode: StorageMode,
    bus: InMemoryEventBus,
    outbound: EventReceiver,
    inbound: Option<Inbound>,
    shutdown: Shutdown,
    pubsub: Arc<InMemoryPubSubRegistry>,
    subscribers: Arc<InMemorySubscriberRegistry>,
    store: Option<Arc<FileSubscriptionStore>>,
    ctx: DispatchContext,
}

impl ProxyRuntime {
    pub async fn new(config: ProxyConfig) -> Result<Self, RuntimeError> {
        Self::with_store_init(config, StoreInit::default()).await
    }

    /// Build the runtime with an explicit store initialisation policy.
    pub async fn with_store_init(
        config: ProxyConfig,
        policy: StoreInit,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let transport = config.transport();
        match &transport.error {
            Some(e) => error!(
                transport = %transport.url,
                error = %e,
                "Transport host unusable, data will be written to log"
            ),
            None => info!(transport = %transport.url, "Transport host configured"),
        }

        let (bus, receivers) = InMemoryEventBus::new();
        let BusReceivers {
            event_in,
            event_out,
            status,
        } = receivers;

        let pubsub = Arc::new(InMemoryPubSubRegistry::new());
        let subscribers = Arc::new(InMemorySubscriberRegistry::new(config.failure_threshold));
        let rest = Arc::new(RestClient::new(config.client_config())?);
        let metrics: Arc<dyn MetricsSink> = Arc::new(PrometheusMetrics);

        let store = Self::open_store(&config, &transport, policy).await;
        let mode = if store.is_some() {
            StorageMode::Durable
        } else {
            StorageMode::EmptyDir
        };
        info!(mode = %mode, "Storage mode selected");

        let mut ctx = DispatchContext::new(
            pubsub.clone(),
            subscribers.clone(),
            rest,
            metrics.clone(),
        );
        if let Some(store) = &store {
            let node = NodeIdentity::new(&config.node_name, &config.namespace);
            let records = store.load(&node.node_name, &node.namespace).await?;
            let restored: usize = records.iter().map(|r| subscribers.restore(r)).sum();
            if restored > 0 {
                metrics.adjust_active_subscriptions(restored as i64);
            }
            info!(
                clients = records.len(),
                subscriptions = restored,
                "Restored persisted subscribers"
            );
            ctx = ctx.with_store(store.clone(), node);
        }

        Ok(Self {
            config,
            transport,
            mode,
            bus,
            outbound: event_out,
            inbound: Some(Inbound {
                events: event_in,
                status,
            }),
            shutdown: Shutdown::new(),
            pubsub,
            subscribers,
            store,
            ctx,
        })
    }

    async fn open_store(
        config: &ProxyConfig,
        transport: &TransportHost,
        policy: StoreInit,
    ) -> Option<Arc<FileSubscriptionStore>> {
        if !config.has_node_identity() {
            info!("NAME_SPACE or NODE_NAME not set, durable store disabled");
            return None;
        }
        if !transport.is_enabled() {
            info!("Transport disabled, durable store disabled");
            return None;
        }
        match FileSubscriptionStore::init(
            &config.store_path,
            &config.node_name,
            &config.namespace,
            policy,
        )
        .await
        {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                error!(error = %e, "Durable store unavailable, falling back to EmptyDir");
                None
            }
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn transport(&self) -> &TransportHost {
        &self.transport
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    /// Handle for producers enqueuing onto the bus.
    pub fn bus(&self) -> &InMemoryEventBus {
        &self.bus
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn pubsub(&self) -> Arc<InMemoryPubSubRegistry> {
        self.pubsub.clone()
    }

    pub fn subscribers(&self) -> Arc<InMemorySubscriberRegistry> {
        self.subscribers.clone()
    }

    pub fn store(&self) -> Option<Arc<FileSubscriptionStore>> {
        self.store.clone()
    }

    /// Hand the inbound queue to a transport adapter.
    ///
    /// Returns `None` once taken. A runtime whose inbound queue was taken
    /// never starts the fallback loop.
    pub fn take_inbound(&mut self) -> Option<Inbound> {
        self.inbound.take()
    }

    /// Run every loop until the shutdown signal fires.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let metrics_addr = metrics_bind_addr(&self.config.metrics_addr)?;
        let metrics_server = tokio::spawn(run_metrics_server(
            metrics_addr,
            self.shutdown.listener(),
            METRICS_RETRY_INTERVAL,
        ));

        let inbound_task = self.inbound.take().map(|inbound| {
            let listener = self.shutdown.listener();
            if self.transport.is_enabled() {
                tokio::spawn(hold_for_transport(inbound, listener))
            } else {
                let fallback = InboundFallbackLoop::new(self.bus.outbound_sender());
                tokio::spawn(async move {
                    fallback
                        .run(inbound.events, inbound.status, listener)
                        .await
                })
            }
        });

        info!(
            mode = %self.mode,
            transport_enabled = self.transport.is_enabled(),
            "Cloud event proxy running"
        );
        let dispatcher = OutboundDispatcher::new(self.ctx.clone());
        dispatcher
            .run(self.outbound, self.shutdown.listener())
            .await;

        if let Some(task) = inbound_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Inbound loop ended abnormally");
            }
        }
        if let Err(e) = metrics_server.await {
            warn!(error = %e, "Metrics server ended abnormally");
        }
        info!("Cloud event proxy stopped");
        Ok(())
    }
}

impl fmt::Debug for ProxyRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRuntime")
            .field("transport", &self.transport.url)
            .field("mode", &self.mode)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

// With an HTTP transport and no adapter attached, inbound messages stay
// queued until shutdown.
async fn hold_for_transport(inbound: Inbound, mut shutdown: ShutdownListener) {
    warn!("No transport adapter attached, inbound queue is not consumed");
    shutdown.wait().await;
    drop(inbound);
}
