use serde::Deserialize;

/// Cache backend pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CachePoolConfig {
    /// Backend URLs (e.g. `redis://cache-0:6379/`); duplicates are dropped
    /// preserving first-seen order. Empty means a single default local
    /// backend.
    #[serde(default)]
    pub backends: Vec<String>,
    /// Connection timeout (e.g. "3s") for opening a backend connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
}

impl Default for CachePoolConfig {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> String {
    "3s".to_owned()
}
