use serde::Deserialize;

/// Model fallback configuration: one ordered chain and one attempt
/// timeout per request mode, plus a global budget across all attempts
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    /// Maximum total time across every attempt in a chain (e.g. "90s")
    #[serde(default = "default_global_budget")]
    pub global_budget: String,
    #[serde(default = "default_quick")]
    pub quick: ModeConfig,
    #[serde(default = "default_normal")]
    pub normal: ModeConfig,
    #[serde(default = "default_thinking")]
    pub thinking: ModeConfig,
    /// Vision-capable requests use a separate, single-fallback chain
    #[serde(default = "default_vision")]
    pub vision: ModeConfig,
}

/// One mode's chain and per-attempt timeout
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeConfig {
    /// Ordered model identifiers, primary first; must be non-empty
    pub chain: Vec<String>,
    /// Per-attempt timeout (e.g. "20s")
    pub timeout: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            global_budget: default_global_budget(),
            quick: default_quick(),
            normal: default_normal(),
            thinking: default_thinking(),
            vision: default_vision(),
        }
    }
}

fn default_global_budget() -> String {
    "90s".to_owned()
}

fn default_quick() -> ModeConfig {
    ModeConfig {
        chain: vec!["arc-mini".to_owned(), "arc-lite".to_owned()],
        timeout: "12s".to_owned(),
    }
}

fn default_normal() -> ModeConfig {
    ModeConfig {
        chain: vec![
            "arc-standard".to_owned(),
            "arc-mini".to_owned(),
            "arc-lite".to_owned(),
        ],
        timeout: "30s".to_owned(),
    }
}

fn default_thinking() -> ModeConfig {
    ModeConfig {
        chain: vec!["arc-reasoner".to_owned(), "arc-standard".to_owned()],
        timeout: "60s".to_owned(),
    }
}

fn default_vision() -> ModeConfig {
    ModeConfig {
        chain: vec!["arc-vision".to_owned(), "arc-standard".to_owned()],
        timeout: "30s".to_owned(),
    }
}
