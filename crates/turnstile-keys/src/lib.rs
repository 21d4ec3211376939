//! Upstream API credential rotation pool
//!
//! Holds the fixed set of upstream keys loaded at startup and hands out a
//! uniformly random format-valid key per outbound call. Spreading
//! independent calls across many keys keeps any single upstream rate
//! limit from being hit twice in a short window.
//!
//! Validation is purely syntactic (prefix check); a selected credential
//! can still be rejected upstream, which the dispatcher handles through
//! its fallback chain.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

use rand::prelude::IndexedRandom;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use turnstile_config::CredentialsConfig;

/// Credential pool errors
#[derive(Debug, Error)]
pub enum KeyError {
    /// No configured key slot passed the format check
    #[error("no upstream credentials configured")]
    NoCredentialsConfigured,
}

/// One upstream API key
///
/// Immutable after load. The secret never appears in logs or error
/// messages; only the slot index does.
pub struct Credential {
    secret: SecretString,
    slot: usize,
}

impl Credential {
    /// Expose the secret value for use in an outbound request
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Position of this key in the configured slot list
    pub const fn slot(&self) -> usize {
        self.slot
    }
}

/// Result of the syntactic format check over all configured slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Slots that passed the format check
    pub valid_count: usize,
    /// Indices of slots that are empty or malformed
    pub missing_indices: Vec<usize>,
}

/// Immutable pool of format-valid upstream credentials
pub struct CredentialPool {
    valid: Vec<Credential>,
    report: ValidationReport,
}

impl CredentialPool {
    /// Load and format-validate the configured key slots
    ///
    /// Empty and malformed slots are tolerated here and surfaced through
    /// [`CredentialPool::validate_all`]; an entirely invalid pool only
    /// fails once a key is actually requested.
    pub fn from_config(config: &CredentialsConfig) -> Self {
        let mut valid = Vec::new();
        let mut missing_indices = Vec::new();

        for (slot, key) in config.keys.iter().enumerate() {
            let value = key.expose_secret().trim();
            if !value.is_empty() && value.starts_with(&config.prefix) {
                valid.push(Credential {
                    secret: SecretString::from(value.to_owned()),
                    slot,
                });
            } else {
                missing_indices.push(slot);
            }
        }

        if valid.is_empty() {
            tracing::warn!(
                slots = config.keys.len(),
                "credential pool loaded with zero valid keys"
            );
        } else {
            tracing::info!(
                valid = valid.len(),
                missing = missing_indices.len(),
                "credential pool ready"
            );
        }

        let report = ValidationReport {
            valid_count: valid.len(),
            missing_indices,
        };

        Self { valid, report }
    }

    /// Pick a format-valid credential, uniformly at random
    ///
    /// No affinity and no rotation state between calls.
    pub fn pick(&self) -> Result<&Credential, KeyError> {
        self.valid
            .choose(&mut rand::rng())
            .ok_or(KeyError::NoCredentialsConfigured)
    }

    /// Format-check summary computed at load time
    pub fn validate_all(&self) -> &ValidationReport {
        &self.report
    }
}
