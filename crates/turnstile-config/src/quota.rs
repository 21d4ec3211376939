use serde::Deserialize;

/// Usage quota configuration
///
/// Guest and tenant buckets are fully independent: separate limits,
/// separate windows, separate key namespaces in storage.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    #[serde(default = "default_guest")]
    pub guest: QuotaWindow,
    #[serde(default = "default_tenant")]
    pub tenant: QuotaWindow,
}

/// One fixed-length admission window
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaWindow {
    /// Maximum admitted requests per window
    pub limit: u32,
    /// Window duration (e.g. "48h"), anchored to an identity's first use
    pub window: String,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            guest: default_guest(),
            tenant: default_tenant(),
        }
    }
}

fn default_guest() -> QuotaWindow {
    QuotaWindow {
        limit: 5,
        window: "48h".to_owned(),
    }
}

fn default_tenant() -> QuotaWindow {
    QuotaWindow {
        limit: 200,
        window: "24h".to_owned(),
    }
}
