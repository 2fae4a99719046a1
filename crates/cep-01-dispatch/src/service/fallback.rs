//! # Inbound Fallback Loop
//!
//! Runs instead of the transport when it is disabled. NEW events and status
//! requests are echoed back onto the outbound queue as SUCCESS (or FAILED if
//! the producer's override rejects them) so producer code paths stay the
//! same. Nothing leaves the process.

use shared_bus::{
    EventReceiver, MessageStatus, MessageType, RoutedMessage, ShutdownListener, StatusRequest,
};
use shared_types::CloudEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Echo loop used while the transport is disabled.
#[derive(Debug, Clone)]
pub struct InboundFallbackLoop {
    outbound: mpsc::Sender<RoutedMessage>,
}

impl InboundFallbackLoop {
    pub fn new(outbound: mpsc::Sender<RoutedMessage>) -> Self {
        Self { outbound }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(
        &self,
        mut inbound: EventReceiver,
        mut status: mpsc::Receiver<StatusRequest>,
        mut shutdown: ShutdownListener,
    ) {
        info!("Transport disabled, inbound fallback loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Inbound fallback loop stopping");
                    return;
                }
                msg = inbound.recv() => match msg {
                    Some(msg) => self.handle(msg).await,
                    None => {
                        warn!("Inbound queue closed, waiting for shutdown");
                        shutdown.wait().await;
                        return;
                    }
                },
                Some(request) = status.recv() => {
                    debug!(
                        address = %request.address,
                        client_id = ?request.client_id,
                        "Transport disabled, status request not forwarded"
                    );
                }
            }
        }
    }

    async fn handle(&self, msg: RoutedMessage) {
        let Some(out) = Self::echo(&msg) else {
            return;
        };
        if self.outbound.send(out).await.is_err() {
            warn!(address = %msg.address, "Outbound queue closed, echo dropped");
        }
    }

    /// Build the outbound echo for an inbound message, if any.
    pub fn echo(msg: &RoutedMessage) -> Option<RoutedMessage> {
        match (msg.message_type, msg.status) {
            (MessageType::Subscriber | MessageType::Publisher, _) => {
                info!(
                    address = %msg.address,
                    message_type = %msg.message_type,
                    "Transport disabled, no action taken: listener cannot be registered"
                );
                None
            }
            (MessageType::Event | MessageType::Status, MessageStatus::New) => {
                let data = msg.data.as_deref().unwrap_or_default();
                if !data.is_empty() {
                    match CloudEvent::from_bytes(data) {
                        Ok(event) => info!(
                            address = %msg.address,
                            event = %event.json_string(),
                            "Transport disabled, event logged"
                        ),
                        Err(e) => warn!(address = %msg.address, error = %e, "Failed to decode inbound event"),
                    }
                }

                let mut out =
                    RoutedMessage::new(msg.message_type, MessageStatus::Success, msg.address.clone());
                out.client_id = msg.client_id;
                out.data = msg.data.clone();
                out.process_event = msg.process_event.clone();

                if let Some(hook) = msg.on_receive_override.as_ref() {
                    let result = hook.on_receive(data, &mut out);
                    out.status = match result {
                        Ok(()) => MessageStatus::Success,
                        Err(e) => {
                            warn!(address = %msg.address, error = %e, "Receive override rejected message");
                            MessageStatus::Failed
                        }
                    };
                }
                Some(out)
            }
            _ => {
                debug!(
                    address = %msg.address,
                    message_type = %msg.message_type,
                    status = %msg.status,
                    "Inbound message ignored"
                );
                None
            }
        }
    }
}
