//! Ledger storage backends
//!
//! Both implementations share the anchoring contract: a counter's TTL is
//! attached exactly once, at first use, and admitted increments never
//! touch it.

pub mod memory;
pub mod redis;

use std::time::Duration;

use crate::error::QuotaError;

/// Point-in-time view of one counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub count: u32,
    /// Unix seconds when the window lapses
    pub expires_at: u64,
}

/// Result of one atomic track operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackResult {
    Admitted { count: u32, expires_at: u64 },
    Denied { expires_at: u64 },
}

/// Storage backend dispatch
pub enum LedgerStorage {
    Memory(memory::MemoryLedger),
    Redis(redis::RedisLedger),
}

impl LedgerStorage {
    pub async fn snapshot(&self, key: &str) -> Result<Option<CounterSnapshot>, QuotaError> {
        match self {
            Self::Memory(m) => Ok(m.snapshot(key)),
            Self::Redis(r) => r.snapshot(key).await,
        }
    }

    pub async fn track(&self, key: &str, limit: u32, window: Duration) -> Result<TrackResult, QuotaError> {
        match self {
            Self::Memory(m) => Ok(m.track(key, limit, window)),
            Self::Redis(r) => r.track(key, limit, window).await,
        }
    }

    pub async fn remove(&self, key: &str) -> Result<(), QuotaError> {
        match self {
            Self::Memory(m) => {
                m.remove(key);
                Ok(())
            }
            Self::Redis(r) => r.remove(key).await,
        }
    }
}
