//! # Dispatch Services
//!
//! - [`OutboundDispatcher`]: drains the outbound queue and applies delivery policy
//! - [`SubscriberLifecycle`]: escalates failing subscribers toward removal
//! - [`InboundFallbackLoop`]: echoes inbound requests while the transport is off

mod context;
mod dispatcher;
mod fallback;
mod lifecycle;

pub use context::{DispatchContext, NodeIdentity};
pub use dispatcher::OutboundDispatcher;
pub use fallback::InboundFallbackLoop;
pub use lifecycle::{LifecycleOutcome, SubscriberLifecycle};
