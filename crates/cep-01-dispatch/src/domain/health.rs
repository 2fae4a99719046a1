//! Subscriber lifecycle states.
//!
//! ```text
//! healthy ──failure──→ degraded ──failure (count ≥ threshold)──→ condemned ──→ removed
//!    ↑                    │
//!    └─────success────────┘
//! ```

/// Health of one subscriber, derived from its consecutive failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberHealth {
    /// No outstanding failures.
    Healthy,
    /// Failing, `remaining` more failures before removal.
    Degraded { failures: u32, remaining: u32 },
    /// Threshold reached, subscriptions are to be deleted.
    Condemned,
}

impl SubscriberHealth {
    /// Derive the state from a failure count.
    pub fn from_count(failures: u32, threshold: u32) -> Self {
        if failures == 0 {
            Self::Healthy
        } else if failures >= threshold {
            Self::Condemned
        } else {
            Self::Degraded {
                failures,
                remaining: threshold - failures,
            }
        }
    }
}
