use serde::Deserialize;

/// Partition store configuration
///
/// Partitions are provisioned once at process start and probed in the
/// order they are declared here; the order is load-bearing for lookup
/// determinism and must not be reshuffled between deployments.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardConfig {
    /// Base URLs of the partition store instances, index 0 first
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Per-probe timeout (e.g. "2s") applied to each partition lookup
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

fn default_probe_timeout() -> String {
    "2s".to_owned()
}
