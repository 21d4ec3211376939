//! Shared vocabulary types for the Turnstile admission core
//!
//! Identity keys, entitlement tiers, subscription state, and the tenant
//! record shape exchanged with partition stores.

#![allow(clippy::must_use_candidate)]

mod identity;
mod record;

pub use identity::IdentityKey;
pub use record::{SubscriptionStatus, TenantRecord, Tier};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix seconds
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
