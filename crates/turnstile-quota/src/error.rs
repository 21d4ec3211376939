use thiserror::Error;

/// Ledger errors
///
/// `Backend` is absorbed inside the ledger (availability-first); it only
/// escapes through the administrative reset path.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// Invalid ledger configuration
    #[error("quota config: {0}")]
    Config(String),
    /// Backing store connection or command failure
    #[error("quota backend: {0}")]
    Backend(String),
}

impl From<turnstile_pool::PoolError> for QuotaError {
    fn from(e: turnstile_pool::PoolError) -> Self {
        Self::Backend(e.to_string())
    }
}
