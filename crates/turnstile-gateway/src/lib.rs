//! Embedded admission-control and dispatch facade
//!
//! Wires the shard locator, backend pool, usage ledgers, response cache,
//! credential pool, and model fallback dispatcher into the four
//! operations the route layer consumes: guest status, guest track, tier
//! resolution, and cached-or-dispatch completion.
//!
//! Every component is constructed once and injected; nothing here is
//! reachable through ambient global state.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

use std::net::IpAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use turnstile_cache::ResponseCache;
use turnstile_config::Config;
use turnstile_core::{IdentityKey, now_secs};
use turnstile_dispatch::{ChatMessage, CompletionProvider, DispatchError, Dispatcher};
use turnstile_entitlement::{Entitlement, SubscriptionResolver};
use turnstile_keys::{CredentialPool, ValidationReport};
use turnstile_models::{Mode, ModeTable};
use turnstile_pool::BackendPool;
use turnstile_quota::{QuotaError, TrackOutcome, UsageLedger, UsageStatus};
use turnstile_shard::ShardSet;

/// A completed (or cache-served) answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// The model that actually produced the answer
    pub model_id: String,
    /// Whether the answer came from the response cache
    pub cached: bool,
}

/// Outcome of a completion request
///
/// Admission denial is an expected outcome, not an error; dispatch
/// failures (chain and budget exhausted) surface as [`DispatchError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Answered(Completion),
    /// Quota exhausted; carries the window's reset time in unix seconds
    Denied { reset_at: u64 },
}

/// Pre-built components for assembling a gateway
///
/// Lets embedding applications and tests swap storage variants; regular
/// deployments go through [`Gateway::from_config`].
pub struct GatewayParts {
    pub guest_ledger: UsageLedger,
    pub tenant_ledger: UsageLedger,
    pub cache: ResponseCache,
    pub dispatcher: Dispatcher,
    pub resolver: SubscriptionResolver,
    pub models: Arc<ModeTable>,
    pub keys: Arc<CredentialPool>,
}

/// The admission-control and dispatch core
pub struct Gateway {
    guest_ledger: UsageLedger,
    tenant_ledger: UsageLedger,
    cache: ResponseCache,
    dispatcher: Dispatcher,
    resolver: SubscriptionResolver,
    models: Arc<ModeTable>,
    keys: Arc<CredentialPool>,
}

impl Gateway {
    /// Assemble a gateway from pre-built components
    pub fn new(parts: GatewayParts) -> Self {
        Self {
            guest_ledger: parts.guest_ledger,
            tenant_ledger: parts.tenant_ledger,
            cache: parts.cache,
            dispatcher: parts.dispatcher,
            resolver: parts.resolver,
            models: parts.models,
            keys: parts.keys,
        }
    }

    /// Build the full redis-backed gateway from configuration
    ///
    /// The completion provider is injected: the actual upstream HTTP
    /// client belongs to the embedding application.
    ///
    /// # Errors
    ///
    /// Configuration problems are fatal here, never per-request: invalid
    /// durations, no shard endpoints, empty model chains, or zero
    /// format-valid upstream credentials.
    pub fn from_config(config: &Config, provider: Arc<dyn CompletionProvider>) -> anyhow::Result<Self> {
        config.validate()?;

        let pool = Arc::new(BackendPool::from_config(&config.cache_pool)?);
        let shards = Arc::new(ShardSet::from_config(&config.shards)?);

        let keys = Arc::new(CredentialPool::from_config(&config.credentials));
        if keys.validate_all().valid_count == 0 {
            anyhow::bail!("no valid upstream credentials configured");
        }

        let models = Arc::new(ModeTable::from_config(&config.models)?);

        // Ledgers get distinct sticky members so one backend outage never
        // takes both namespaces down at once
        let guest_ledger = UsageLedger::redis(Arc::clone(&pool), 0, &config.quota.guest)?;
        let tenant_ledger = UsageLedger::redis(Arc::clone(&pool), 1, &config.quota.tenant)?;

        let cache = ResponseCache::redis(Arc::clone(&pool), &config.response_cache)?;
        let dispatcher = Dispatcher::new(provider, Arc::clone(&models), Arc::clone(&keys));
        let resolver = SubscriptionResolver::from_config(shards, &config.entitlement)?;

        Ok(Self::new(GatewayParts {
            guest_ledger,
            tenant_ledger,
            cache,
            dispatcher,
            resolver,
            models,
            keys,
        }))
    }

    /// Remaining guest allowance for an address, without consuming quota
    pub async fn guest_status(&self, ip: IpAddr) -> UsageStatus {
        self.guest_ledger.status(&IdentityKey::Guest(ip)).await
    }

    /// Admit or deny one guest request
    pub async fn guest_track(&self, ip: IpAddr) -> TrackOutcome {
        self.guest_ledger.track(&IdentityKey::Guest(ip)).await
    }

    /// Resolve an identity's effective entitlement
    ///
    /// Guests have no tenant record by definition and resolve without a
    /// shard probe.
    pub async fn resolve_tier(&self, identity: &IdentityKey) -> Arc<Entitlement> {
        match identity {
            IdentityKey::Guest(_) => Arc::new(Entitlement::none()),
            IdentityKey::Tenant(id) => self.resolver.resolve(id).await,
        }
    }

    /// Serve a completion from cache or dispatch it upstream
    ///
    /// Flow: admission check → cache lookup → on miss, fallback-chain
    /// dispatch → quota commit → cache store. A cache hit is served
    /// without consuming quota; an exhausted identity is denied before
    /// the cache is consulted.
    pub async fn complete(
        &self,
        identity: &IdentityKey,
        mode: Mode,
        query: &str,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<CompletionResult, DispatchError> {
        let ledger = self.ledger_for(identity);

        let status = ledger.status(identity).await;
        if status.remaining == 0 {
            let reset_at = status.reset_at.unwrap_or_else(now_secs);
            tracing::debug!(identity = %identity, reset_at, "completion denied by quota");
            return Ok(CompletionResult::Denied { reset_at });
        }

        // Any chain entry may have produced a cached answer for this
        // query, so look up each in order
        for model_id in self.models.chain_for(mode) {
            if let Some(hit) = self.cache.get(query, model_id).await {
                return Ok(CompletionResult::Answered(Completion {
                    text: hit.text,
                    model_id: hit.model_id,
                    cached: true,
                }));
            }
        }

        let outcome = self.dispatcher.dispatch(mode, messages, cancel).await?;

        let committed = ledger.track(identity).await;
        if !committed.admitted {
            // Lost an admission race while dispatching; the answer is
            // already produced, so serve it and let the window absorb the
            // bounded overshoot
            tracing::warn!(identity = %identity, "quota window filled during dispatch");
        }

        self.cache.put(query, &outcome.model_id, &outcome.text).await;

        Ok(CompletionResult::Answered(Completion {
            text: outcome.text,
            model_id: outcome.model_id,
            cached: false,
        }))
    }

    /// Administrative reset of an identity's usage window
    pub async fn reset_usage(&self, identity: &IdentityKey) -> Result<(), QuotaError> {
        self.ledger_for(identity).reset(identity).await
    }

    /// Format-check summary of the configured credential slots
    pub fn credential_report(&self) -> &ValidationReport {
        self.keys.validate_all()
    }

    const fn ledger_for(&self, identity: &IdentityKey) -> &UsageLedger {
        match identity {
            IdentityKey::Guest(_) => &self.guest_ledger,
            IdentityKey::Tenant(_) => &self.tenant_ledger,
        }
    }
}
