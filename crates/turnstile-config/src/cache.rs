use serde::Deserialize;

/// Response cache retention and write policy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseCacheConfig {
    /// Retention applied at write time (e.g. "7d"); never refreshed on read
    #[serde(default = "default_ttl")]
    pub ttl: String,
    /// Responses shorter than this are not cached
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Responses containing any of these substrings are not cached
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<String>,
    /// Storage key prefix
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            min_length: default_min_length(),
            error_markers: default_error_markers(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_ttl() -> String {
    "7d".to_owned()
}

fn default_min_length() -> usize {
    10
}

fn default_error_markers() -> Vec<String> {
    vec!["[upstream-error]".to_owned()]
}

fn default_key_prefix() -> String {
    "turnstile:answers".to_owned()
}
