use std::time::Duration;

use dashmap::DashMap;
use turnstile_core::now_secs;

use super::{CounterSnapshot, TrackResult};

struct CounterEntry {
    count: u32,
    expires_at: u64,
}

impl CounterEntry {
    fn expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

/// In-process ledger storage
///
/// Expiry is lazy: a lapsed entry is replaced on next access, mirroring
/// the TTL semantics of the remote store. Per-key atomicity comes from
/// the map's entry locking.
#[derive(Default)]
pub struct MemoryLedger {
    counters: DashMap<String, CounterEntry>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, key: &str) -> Option<CounterSnapshot> {
        let now = now_secs();
        let entry = self.counters.get(key)?;

        if entry.expired(now) {
            drop(entry);
            self.counters.remove(key);
            return None;
        }

        Some(CounterSnapshot {
            count: entry.count,
            expires_at: entry.expires_at,
        })
    }

    pub fn track(&self, key: &str, limit: u32, window: Duration) -> TrackResult {
        let now = now_secs();
        let mut entry = self
            .counters
            .entry(key.to_owned())
            .or_insert_with(|| CounterEntry {
                count: 0,
                expires_at: now + window.as_secs(),
            });

        // Lapsed window: start a fresh one anchored to this request
        if entry.expired(now) {
            entry.count = 0;
            entry.expires_at = now + window.as_secs();
        }

        if entry.count >= limit {
            return TrackResult::Denied {
                expires_at: entry.expires_at,
            };
        }

        entry.count += 1;
        TrackResult::Admitted {
            count: entry.count,
            expires_at: entry.expires_at,
        }
    }

    pub fn remove(&self, key: &str) {
        self.counters.remove(key);
    }
}
