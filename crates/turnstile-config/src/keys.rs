use secrecy::SecretString;
use serde::Deserialize;

/// Upstream API credential pool configuration
///
/// Slots are typically populated from the environment:
///
/// ```toml
/// [credentials]
/// keys = [
///     "{{ env.UPSTREAM_KEY_0 }}",
///     "{{ env.UPSTREAM_KEY_1 | default("") }}",
/// ]
/// ```
///
/// Empty or malformed slots are tolerated at parse time and reported by
/// the credential pool's format validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Configured key slots, in declaration order
    #[serde(default)]
    pub keys: Vec<SecretString>,
    /// Required key prefix for the syntactic format check
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "sk-".to_owned()
}
