//! Per-mode model fallback chains
//!
//! A static lookup table from request mode to an ordered chain of
//! upstream model identifiers, a per-attempt timeout, and a global
//! budget across all attempts. Loaded once from configuration and
//! immutable afterwards; ordering never adapts within a process run.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use turnstile_config::{ModeConfig, ModelsConfig};

/// Mode table errors (construction only)
#[derive(Debug, Error)]
pub enum ModelsError {
    #[error("models config: {0}")]
    Config(String),
}

/// Request mode, chosen by the caller per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Short-answer mode, cheapest chain
    Quick,
    Normal,
    /// Extended reasoning, longest per-attempt timeout
    Thinking,
    /// Image-bearing requests; separate single-fallback chain
    Vision,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quick => "quick",
            Self::Normal => "normal",
            Self::Thinking => "thinking",
            Self::Vision => "vision",
        };
        f.write_str(name)
    }
}

struct ModeChain {
    chain: Vec<String>,
    timeout: Duration,
}

/// Immutable mode → chain/timeout table
pub struct ModeTable {
    quick: ModeChain,
    normal: ModeChain,
    thinking: ModeChain,
    vision: ModeChain,
    global_budget: Duration,
}

impl ModeTable {
    pub fn from_config(config: &ModelsConfig) -> Result<Self, ModelsError> {
        let global_budget = parse("global_budget", &config.global_budget)?;

        Ok(Self {
            quick: build("quick", &config.quick)?,
            normal: build("normal", &config.normal)?,
            thinking: build("thinking", &config.thinking)?,
            vision: build("vision", &config.vision)?,
            global_budget,
        })
    }

    /// Ordered model chain for a mode, primary first; never empty
    pub fn chain_for(&self, mode: Mode) -> &[String] {
        &self.entry(mode).chain
    }

    /// The first model attempted for a mode
    pub fn primary_for(&self, mode: Mode) -> &str {
        &self.entry(mode).chain[0]
    }

    /// Per-attempt timeout for a mode
    pub fn timeout_for(&self, mode: Mode) -> Duration {
        self.entry(mode).timeout
    }

    /// Maximum total time across all attempts in any chain
    pub const fn global_budget(&self) -> Duration {
        self.global_budget
    }

    const fn entry(&self, mode: Mode) -> &ModeChain {
        match mode {
            Mode::Quick => &self.quick,
            Mode::Normal => &self.normal,
            Mode::Thinking => &self.thinking,
            Mode::Vision => &self.vision,
        }
    }
}

fn build(name: &str, config: &ModeConfig) -> Result<ModeChain, ModelsError> {
    if config.chain.is_empty() {
        return Err(ModelsError::Config(format!("{name} chain must not be empty")));
    }

    Ok(ModeChain {
        chain: config.chain.clone(),
        timeout: parse(&format!("{name} timeout"), &config.timeout)?,
    })
}

fn parse(field: &str, value: &str) -> Result<Duration, ModelsError> {
    duration_str::parse(value).map_err(|e| ModelsError::Config(format!("invalid {field} '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ModeTable {
        ModeTable::from_config(&ModelsConfig::default()).unwrap()
    }

    #[test]
    fn quick_chain_starts_with_configured_primary() {
        let config = ModelsConfig::default();
        let table = ModeTable::from_config(&config).unwrap();

        let chain = table.chain_for(Mode::Quick);
        assert!(!chain.is_empty());
        assert_eq!(chain[0], config.quick.chain[0]);
        assert_eq!(table.primary_for(Mode::Quick), config.quick.chain[0]);
    }

    #[test]
    fn vision_chain_is_separate() {
        let table = table();
        assert_ne!(table.chain_for(Mode::Vision), table.chain_for(Mode::Normal));
    }

    #[test]
    fn empty_chain_rejected() {
        let mut config = ModelsConfig::default();
        config.normal.chain.clear();
        assert!(matches!(ModeTable::from_config(&config), Err(ModelsError::Config(_))));
    }

    #[test]
    fn timeouts_and_budget_parse() {
        let table = table();
        assert!(table.timeout_for(Mode::Quick) < table.timeout_for(Mode::Thinking));
        assert!(table.global_budget() >= table.timeout_for(Mode::Thinking));
    }

    #[test]
    fn mode_parses_from_config_strings() {
        let mode: Mode = serde_json::from_str("\"thinking\"").unwrap();
        assert_eq!(mode, Mode::Thinking);
    }
}
