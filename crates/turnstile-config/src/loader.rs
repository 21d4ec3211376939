use std::path::Path;
use std::time::Duration;

use crate::{Config, ModeConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw)
            .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self =
            toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// Configuration problems are fatal here, at startup-equivalent time,
    /// never surfaced per-request.
    ///
    /// # Errors
    ///
    /// Returns an error on missing shards, empty model chains, zero quota
    /// limits, unparseable durations, or a global model budget smaller
    /// than a single mode's timeout
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_shards()?;
        self.validate_quota()?;
        self.validate_models()?;
        self.validate_durations()?;
        Ok(())
    }

    fn validate_shards(&self) -> anyhow::Result<()> {
        if self.shards.endpoints.is_empty() {
            anyhow::bail!("at least one shard endpoint must be configured");
        }
        Ok(())
    }

    fn validate_quota(&self) -> anyhow::Result<()> {
        if self.quota.guest.limit == 0 {
            anyhow::bail!("quota.guest.limit must be greater than 0");
        }
        if self.quota.tenant.limit == 0 {
            anyhow::bail!("quota.tenant.limit must be greater than 0");
        }
        Ok(())
    }

    fn validate_models(&self) -> anyhow::Result<()> {
        let budget = parse_duration("models.global_budget", &self.models.global_budget)?;

        for (name, mode) in self.modes() {
            if mode.chain.is_empty() {
                anyhow::bail!("models.{name}.chain must not be empty");
            }
            let timeout = parse_duration(&format!("models.{name}.timeout"), &mode.timeout)?;
            if timeout > budget {
                anyhow::bail!(
                    "models.{name}.timeout ({}) exceeds models.global_budget ({})",
                    mode.timeout,
                    self.models.global_budget
                );
            }
        }

        Ok(())
    }

    fn validate_durations(&self) -> anyhow::Result<()> {
        parse_duration("shards.probe_timeout", &self.shards.probe_timeout)?;
        parse_duration("cache_pool.connect_timeout", &self.cache_pool.connect_timeout)?;
        parse_duration("quota.guest.window", &self.quota.guest.window)?;
        parse_duration("quota.tenant.window", &self.quota.tenant.window)?;
        parse_duration("response_cache.ttl", &self.response_cache.ttl)?;
        parse_duration("entitlement.cache_ttl", &self.entitlement.cache_ttl)?;
        Ok(())
    }

    fn modes(&self) -> [(&'static str, &ModeConfig); 4] {
        [
            ("quick", &self.models.quick),
            ("normal", &self.models.normal),
            ("thinking", &self.models.thinking),
            ("vision", &self.models.vision),
        ]
    }
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} ('{value}'): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Config {
        toml::from_str(
            r#"
            [shards]
            endpoints = ["http://shard-0.internal:8081"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_config_validates() {
        minimal().validate().unwrap();
    }

    #[test]
    fn missing_shards_rejected() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shard endpoint"));
    }

    #[test]
    fn zero_guest_limit_rejected() {
        let mut config = minimal();
        config.quota.guest.limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quota.guest.limit"));
    }

    #[test]
    fn empty_chain_rejected() {
        let mut config = minimal();
        config.models.quick.chain.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("models.quick.chain"));
    }

    #[test]
    fn mode_timeout_over_budget_rejected() {
        let mut config = minimal();
        config.models.global_budget = "10s".to_owned();
        config.models.thinking.timeout = "60s".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("models.thinking.timeout"));
    }

    #[test]
    fn bad_duration_rejected() {
        let mut config = minimal();
        config.quota.guest.window = "not-a-duration".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<Config, _> = toml::from_str("surprise = true");
        assert!(result.is_err());
    }
}
