//! # Shutdown Signal
//!
//! One process-wide signal, closed exactly once, observed by every loop.
//! Loops return as soon as it fires; queues are not drained.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Broadcast shutdown handle. Clones share the same signal.
#[derive(Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fire the signal. Returns `true` only for the call that closed it.
    pub fn trigger(&self) -> bool {
        let fired = self.sender.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });
        if fired {
            info!("Shutdown signal fired");
        }
        fired
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// A listener for one loop.
    #[must_use]
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once the signal has fired, immediately if it already has.
    pub async fn wait(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                // Sender gone: nobody can fire the signal any more, treat as closed.
                return;
            }
        }
    }
}
