//! Subscription state resolution
//!
//! Reconciles a tenant's entitlement tier against the shard data,
//! applying the expiry downgrade: a cancelled subscription past its
//! paid-through date is rewritten to the lowest tier with status
//! expired. This is the only read path that mutates shard state, and the
//! rewrite is idempotent.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

use std::sync::Arc;

use mini_moka::sync::Cache;
use turnstile_config::EntitlementConfig;
use turnstile_core::{SubscriptionStatus, TenantRecord, Tier, now_secs};
use turnstile_shard::ShardSet;

const SECONDS_PER_DAY: u64 = 86_400;

/// A tenant's effective entitlement at resolution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    pub tier: Tier,
    pub status: SubscriptionStatus,
    /// Paid-through timestamp in unix seconds, when a subscription exists
    pub expires_at: Option<u64>,
    /// Whole days until expiry, rounded up; `None` without an expiry
    pub days_remaining: Option<u64>,
}

impl Entitlement {
    /// Entitlement for identities with no record on any partition
    pub const fn none() -> Self {
        Self {
            tier: Tier::lowest(),
            status: SubscriptionStatus::None,
            expires_at: None,
            days_remaining: None,
        }
    }
}

/// Resolves entitlements through the shard locator, with TTL caching
pub struct SubscriptionResolver {
    shards: Arc<ShardSet>,
    cache: Cache<String, Arc<Entitlement>>,
}

impl SubscriptionResolver {
    pub fn from_config(shards: Arc<ShardSet>, config: &EntitlementConfig) -> anyhow::Result<Self> {
        let ttl = duration_str::parse(&config.cache_ttl)
            .map_err(|e| anyhow::anyhow!("invalid entitlement.cache_ttl: {e}"))?;

        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(config.cache_capacity)
            .build();

        Ok(Self { shards, cache })
    }

    /// Resolve an identity's effective tier
    ///
    /// A missing record (including unreachable partitions) resolves to
    /// the lowest tier with no subscription; admission still proceeds on
    /// the guest path in that case, so resolution itself never fails.
    pub async fn resolve(&self, identity_key: &str) -> Arc<Entitlement> {
        if let Some(cached) = self.cache.get(&identity_key.to_owned()) {
            return cached;
        }

        let Some(located) = self.shards.locate(identity_key).await else {
            let entitlement = Arc::new(Entitlement::none());
            self.cache.insert(identity_key.to_owned(), Arc::clone(&entitlement));
            return entitlement;
        };

        let now = now_secs();
        let record = &located.record;

        if record.is_lapsed(now) {
            let mut downgraded = record.clone();
            downgraded.tier = Tier::lowest();
            downgraded.subscription_status = SubscriptionStatus::Expired;

            let entitlement = Arc::new(from_record(&downgraded, now));

            match located.write_back(&downgraded).await {
                Ok(()) => {
                    tracing::info!(
                        identity = identity_key,
                        partition = located.partition,
                        "downgraded lapsed subscription"
                    );
                    self.cache.insert(identity_key.to_owned(), Arc::clone(&entitlement));
                }
                Err(e) => {
                    // Serve the downgraded view anyway; skipping the cache
                    // lets the next resolution retry the write
                    tracing::warn!(
                        identity = identity_key,
                        partition = located.partition,
                        error = %e,
                        "subscription downgrade write-back failed"
                    );
                }
            }

            return entitlement;
        }

        let entitlement = Arc::new(from_record(record, now));
        self.cache.insert(identity_key.to_owned(), Arc::clone(&entitlement));
        entitlement
    }

    /// Drop a cached resolution, e.g. after a payment-settlement event
    pub fn invalidate(&self, identity_key: &str) {
        self.cache.invalidate(&identity_key.to_owned());
    }
}

fn from_record(record: &TenantRecord, now: u64) -> Entitlement {
    let days_remaining = record
        .subscription_expires_at
        .map(|at| at.saturating_sub(now).div_ceil(SECONDS_PER_DAY));

    Entitlement {
        tier: record.tier,
        status: record.subscription_status,
        expires_at: record.subscription_expires_at,
        days_remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use turnstile_shard::{MemoryPartitionStore, PartitionStore, StoreError};

    /// Store double that counts operations and optionally refuses writes
    struct InstrumentedStore {
        inner: MemoryPartitionStore,
        fetches: AtomicUsize,
        stores: AtomicUsize,
        refuse_writes: bool,
    }

    impl InstrumentedStore {
        fn seeded(record: TenantRecord, refuse_writes: bool) -> Arc<Self> {
            let inner = MemoryPartitionStore::new();
            inner.insert(record);
            Arc::new(Self {
                inner,
                fetches: AtomicUsize::new(0),
                stores: AtomicUsize::new(0),
                refuse_writes,
            })
        }
    }

    #[async_trait]
    impl PartitionStore for InstrumentedStore {
        async fn fetch(&self, identity_key: &str) -> Result<Option<TenantRecord>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(identity_key).await
        }

        async fn store(&self, record: &TenantRecord) -> Result<(), StoreError> {
            self.stores.fetch_add(1, Ordering::SeqCst);
            if self.refuse_writes {
                return Err(StoreError::Transport("connection refused".to_owned()));
            }
            self.inner.store(record).await
        }
    }

    fn record(status: SubscriptionStatus, tier: Tier, expires_at: Option<u64>) -> TenantRecord {
        TenantRecord {
            id: "acct_1".to_owned(),
            email: "one@example.com".to_owned(),
            tier,
            subscription_status: status,
            subscription_expires_at: expires_at,
        }
    }

    fn resolver(store: Arc<InstrumentedStore>, cache_ttl: &str) -> SubscriptionResolver {
        let shards = Arc::new(ShardSet::new(
            vec![store as Arc<dyn PartitionStore>],
            Duration::from_secs(1),
        ));
        SubscriptionResolver::from_config(
            shards,
            &EntitlementConfig {
                cache_ttl: cache_ttl.to_owned(),
                cache_capacity: 100,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lapsed_subscription_downgrades_and_is_idempotent() {
        let store = InstrumentedStore::seeded(
            record(SubscriptionStatus::Cancelled, Tier::Pro, Some(now_secs() - 3600)),
            false,
        );
        // Zero-ish cache TTL so the second resolve goes back to the shard
        let resolver = resolver(Arc::clone(&store), "1ms");

        let first = resolver.resolve("acct_1").await;
        assert_eq!(first.status, SubscriptionStatus::Expired);
        assert_eq!(first.tier, Tier::lowest());
        assert_eq!(store.stores.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = resolver.resolve("acct_1").await;
        assert_eq!(second.status, SubscriptionStatus::Expired);
        assert_eq!(second.tier, Tier::lowest());
        // Already downgraded: no further write
        assert_eq!(store.stores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn active_subscription_reports_days_remaining() {
        let expires = now_secs() + 30 * SECONDS_PER_DAY;
        let store = InstrumentedStore::seeded(
            record(SubscriptionStatus::Active, Tier::Plus, Some(expires)),
            false,
        );
        let resolver = resolver(store, "60s");

        let entitlement = resolver.resolve("acct_1").await;
        assert_eq!(entitlement.tier, Tier::Plus);
        assert_eq!(entitlement.status, SubscriptionStatus::Active);
        assert_eq!(entitlement.expires_at, Some(expires));
        assert_eq!(entitlement.days_remaining, Some(30));
    }

    #[tokio::test]
    async fn cancelled_but_paid_through_keeps_tier() {
        let store = InstrumentedStore::seeded(
            record(SubscriptionStatus::Cancelled, Tier::Pro, Some(now_secs() + 3600)),
            false,
        );
        let resolver = resolver(Arc::clone(&store), "60s");

        let entitlement = resolver.resolve("acct_1").await;
        assert_eq!(entitlement.tier, Tier::Pro);
        assert_eq!(entitlement.status, SubscriptionStatus::Cancelled);
        assert_eq!(store.stores.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_record_resolves_to_lowest() {
        let store = InstrumentedStore::seeded(
            record(SubscriptionStatus::Active, Tier::Pro, None),
            false,
        );
        let resolver = resolver(store, "60s");

        let entitlement = resolver.resolve("acct_unknown").await;
        assert_eq!(entitlement.tier, Tier::lowest());
        assert_eq!(entitlement.status, SubscriptionStatus::None);
        assert_eq!(entitlement.days_remaining, None);
    }

    #[tokio::test]
    async fn resolutions_are_cached() {
        let store = InstrumentedStore::seeded(
            record(SubscriptionStatus::Active, Tier::Plus, None),
            false,
        );
        let resolver = resolver(Arc::clone(&store), "60s");

        resolver.resolve("acct_1").await;
        resolver.resolve("acct_1").await;
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        resolver.invalidate("acct_1");
        resolver.resolve("acct_1").await;
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_write_back_still_serves_downgraded_view() {
        let store = InstrumentedStore::seeded(
            record(SubscriptionStatus::Cancelled, Tier::Pro, Some(now_secs() - 3600)),
            true,
        );
        let resolver = resolver(Arc::clone(&store), "60s");

        let entitlement = resolver.resolve("acct_1").await;
        assert_eq!(entitlement.tier, Tier::lowest());
        assert_eq!(entitlement.status, SubscriptionStatus::Expired);

        // The failed write is retried on the next resolution
        resolver.resolve("acct_1").await;
        assert_eq!(store.stores.load(Ordering::SeqCst), 2);
    }
}
