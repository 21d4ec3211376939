#![allow(clippy::must_use_candidate)]

//! Turnstile configuration
//!
//! TOML-backed, with `{{ env.VAR }}` expansion over the raw file text so
//! secrets stay out of checked-in configuration.

pub mod cache;
pub mod entitlement;
mod env;
pub mod keys;
mod loader;
pub mod models;
pub mod pool;
pub mod quota;
pub mod shard;

use serde::Deserialize;

pub use cache::ResponseCacheConfig;
pub use entitlement::EntitlementConfig;
pub use env::expand_env;
pub use keys::CredentialsConfig;
pub use models::{ModeConfig, ModelsConfig};
pub use pool::CachePoolConfig;
pub use quota::{QuotaConfig, QuotaWindow};
pub use shard::ShardConfig;

/// Top-level Turnstile configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Partition store endpoints, probed in declaration order
    #[serde(default)]
    pub shards: ShardConfig,
    /// Cache backend pool
    #[serde(default)]
    pub cache_pool: CachePoolConfig,
    /// Upstream API credential pool
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Guest and tenant usage quotas
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Response cache retention and write policy
    #[serde(default)]
    pub response_cache: ResponseCacheConfig,
    /// Per-mode model fallback chains
    #[serde(default)]
    pub models: ModelsConfig,
    /// Subscription resolution caching
    #[serde(default)]
    pub entitlement: EntitlementConfig,
}
