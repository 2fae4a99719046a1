//! # Domain Layer for Outbound Dispatch
//!
//! Pure decision logic with no I/O.
//!
//! - **classifier**: maps a delivery error to a [`FailureCause`]
//! - **health**: the per-subscriber lifecycle states derived from a
//!   failure count and the removal threshold

mod classifier;
mod health;

pub use classifier::*;
pub use health::*;
