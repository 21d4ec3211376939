use serde::Deserialize;

/// Subscription resolution caching
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitlementConfig {
    /// How long a resolved entitlement may be served from cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,
    /// Maximum cached resolutions
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            cache_ttl: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_ttl() -> String {
    "60s".to_owned()
}

fn default_cache_capacity() -> u64 {
    10_000
}
