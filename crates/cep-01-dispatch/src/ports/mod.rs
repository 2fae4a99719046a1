//! Ports of the dispatch subsystem.
//!
//! The dispatcher owns no inbound API beyond its loops; everything it talks
//! to is an outbound port implemented by adapters.

pub mod outbound;
