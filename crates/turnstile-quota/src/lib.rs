//! Usage ledger: fixed-window admission counters per identity
//!
//! Each identity gets one decision window per TTL period, anchored to its
//! first request: later requests never extend the window, and expiry is
//! the backing store's own TTL, with no background sweep. Guest and
//! tenant ledgers are independent (separate limits, windows, and key
//! namespaces).

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
pub mod storage;

pub use error::QuotaError;

use std::sync::Arc;
use std::time::Duration;

use turnstile_config::QuotaWindow;
use turnstile_core::{IdentityKey, now_secs};
use turnstile_pool::BackendPool;

use storage::{CounterSnapshot, LedgerStorage, TrackResult, memory::MemoryLedger, redis::RedisLedger};

/// Read-only view of an identity's window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageStatus {
    /// Requests left before denial; never negative
    pub remaining: u32,
    pub limit: u32,
    /// Unix seconds when the current window lapses; `None` before first use
    pub reset_at: Option<u64>,
}

/// Outcome of one admission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub admitted: bool,
    /// Requests left after this attempt; never negative
    pub remaining: u32,
    /// Unix seconds when the current window lapses
    pub reset_at: u64,
}

/// Admission counter over one storage backend
///
/// Backend unavailability is availability-first: a failed read or
/// increment admits the request with a warning rather than blocking the
/// caller behind a downed store.
pub struct UsageLedger {
    storage: LedgerStorage,
    limit: u32,
    window: Duration,
}

impl UsageLedger {
    /// Ledger over the in-process store (tests, single-instance deployments)
    pub fn memory(config: &QuotaWindow) -> Result<Self, QuotaError> {
        let window = parse_window(&config.window)?;
        Ok(Self {
            storage: LedgerStorage::Memory(MemoryLedger::new()),
            limit: config.limit,
            window,
        })
    }

    /// Ledger over a sticky pool member
    ///
    /// All counters of this ledger land on `pool.select_by_index(sticky)`,
    /// so one logical counter never splits across backends.
    pub fn redis(pool: Arc<BackendPool>, sticky: usize, config: &QuotaWindow) -> Result<Self, QuotaError> {
        let window = parse_window(&config.window)?;
        Ok(Self {
            storage: LedgerStorage::Redis(RedisLedger::new(pool, sticky)),
            limit: config.limit,
            window,
        })
    }

    /// Inspect an identity's window without consuming quota
    ///
    /// Never creates a record; an identity that has not used its window
    /// reports the full allowance with no reset time.
    pub async fn status(&self, identity: &IdentityKey) -> UsageStatus {
        let key = ledger_key(identity);

        match self.storage.snapshot(&key).await {
            Ok(Some(CounterSnapshot { count, expires_at })) => UsageStatus {
                remaining: self.limit.saturating_sub(count),
                limit: self.limit,
                reset_at: Some(expires_at),
            },
            Ok(None) => UsageStatus {
                remaining: self.limit,
                limit: self.limit,
                reset_at: None,
            },
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "quota status read failed, reporting full allowance");
                UsageStatus {
                    remaining: self.limit,
                    limit: self.limit,
                    reset_at: None,
                }
            }
        }
    }

    /// Admit or deny one request
    ///
    /// First use creates the counter with the window TTL. Later admitted
    /// requests increment without touching the TTL, keeping `reset_at`
    /// invariant across the window. At or over the limit the request is
    /// denied without incrementing, carrying the original window's reset
    /// time.
    pub async fn track(&self, identity: &IdentityKey) -> TrackOutcome {
        let key = ledger_key(identity);

        match self.storage.track(&key, self.limit, self.window).await {
            Ok(TrackResult::Admitted { count, expires_at }) => TrackOutcome {
                admitted: true,
                remaining: self.limit.saturating_sub(count),
                reset_at: expires_at,
            },
            Ok(TrackResult::Denied { expires_at }) => {
                tracing::debug!(identity = %identity, limit = self.limit, "quota exhausted");
                TrackOutcome {
                    admitted: false,
                    remaining: 0,
                    reset_at: expires_at,
                }
            }
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "quota track failed, admitting");
                TrackOutcome {
                    admitted: true,
                    remaining: self.limit.saturating_sub(1),
                    reset_at: now_secs() + self.window.as_secs(),
                }
            }
        }
    }

    /// Administrative reset: drop the identity's current window
    pub async fn reset(&self, identity: &IdentityKey) -> Result<(), QuotaError> {
        self.storage.remove(&ledger_key(identity)).await
    }

    /// Configured per-window limit
    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

fn ledger_key(identity: &IdentityKey) -> String {
    format!("quota:{}", identity.storage_key())
}

fn parse_window(window: &str) -> Result<Duration, QuotaError> {
    duration_str::parse(window).map_err(|e| QuotaError::Config(format!("invalid window '{window}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn guest(ip: &str) -> IdentityKey {
        IdentityKey::Guest(ip.parse::<IpAddr>().unwrap())
    }

    fn ledger(limit: u32, window: &str) -> UsageLedger {
        UsageLedger::memory(&QuotaWindow {
            limit,
            window: window.to_owned(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn five_then_denied_with_anchored_reset() {
        let ledger = ledger(5, "48h");
        let identity = guest("203.0.113.7");

        let first = ledger.track(&identity).await;
        assert!(first.admitted);
        assert_eq!(first.remaining, 4);

        let window_end = first.reset_at;
        let expected = now_secs() + 48 * 3600;
        assert!(window_end.abs_diff(expected) <= 2);

        for expected_remaining in [3, 2, 1, 0] {
            let outcome = ledger.track(&identity).await;
            assert!(outcome.admitted);
            assert_eq!(outcome.remaining, expected_remaining);
            assert_eq!(outcome.reset_at, window_end);
        }

        let denied = ledger.track(&identity).await;
        assert!(!denied.admitted);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at, window_end);
    }

    #[tokio::test]
    async fn remaining_never_negative() {
        let ledger = ledger(2, "1h");
        let identity = guest("203.0.113.8");

        for _ in 0..6 {
            let outcome = ledger.track(&identity).await;
            assert!(outcome.remaining <= 2);
        }

        let status = ledger.status(&identity).await;
        assert_eq!(status.remaining, 0);
    }

    #[tokio::test]
    async fn status_before_first_use_has_no_window() {
        let ledger = ledger(5, "48h");
        let status = ledger.status(&guest("203.0.113.9")).await;

        assert_eq!(status.remaining, 5);
        assert_eq!(status.limit, 5);
        assert_eq!(status.reset_at, None);
    }

    #[tokio::test]
    async fn status_does_not_consume_quota() {
        let ledger = ledger(3, "1h");
        let identity = guest("203.0.113.10");

        ledger.track(&identity).await;
        ledger.status(&identity).await;
        ledger.status(&identity).await;

        assert_eq!(ledger.status(&identity).await.remaining, 2);
    }

    #[tokio::test]
    async fn identities_are_independent() {
        let ledger = ledger(1, "1h");
        let first = guest("203.0.113.11");
        let second = guest("203.0.113.12");

        assert!(ledger.track(&first).await.admitted);
        assert!(!ledger.track(&first).await.admitted);
        assert!(ledger.track(&second).await.admitted);
    }

    #[tokio::test]
    async fn guest_and_tenant_namespaces_are_disjoint() {
        let ledger = ledger(1, "1h");
        let as_guest = guest("203.0.113.13");
        let as_tenant = IdentityKey::Tenant("203.0.113.13".to_owned());

        assert!(ledger.track(&as_guest).await.admitted);
        assert!(ledger.track(&as_tenant).await.admitted);
    }

    #[tokio::test]
    async fn reset_reopens_the_window() {
        let ledger = ledger(1, "1h");
        let identity = guest("203.0.113.14");

        assert!(ledger.track(&identity).await.admitted);
        assert!(!ledger.track(&identity).await.admitted);

        ledger.reset(&identity).await.unwrap();
        assert!(ledger.track(&identity).await.admitted);
    }

    #[tokio::test]
    async fn expired_window_resets_lazily() {
        let ledger = ledger(1, "1s");
        let identity = guest("203.0.113.15");

        assert!(ledger.track(&identity).await.admitted);
        assert!(!ledger.track(&identity).await.admitted);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let outcome = ledger.track(&identity).await;
        assert!(outcome.admitted);
        assert_eq!(outcome.remaining, 0);
    }
}
