use std::time::Duration;

use thiserror::Error;

/// Dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Upstream returned a failure for one attempt
    #[error("upstream error from {model_id}: {message}")]
    Upstream { model_id: String, message: String },

    /// One attempt exceeded the mode's timeout
    #[error("{model_id} timed out after {after:?}")]
    AttemptTimeout { model_id: String, after: Duration },

    /// The global budget lapsed before the chain produced an answer
    #[error("dispatch budget of {budget:?} exhausted")]
    BudgetExhausted { budget: Duration },

    /// Caller disconnected or cancelled the request
    #[error("dispatch cancelled by caller")]
    Cancelled,

    /// No usable upstream credential
    #[error(transparent)]
    Credentials(#[from] turnstile_keys::KeyError),
}

impl DispatchError {
    /// Whether the next chain entry should be attempted
    ///
    /// Credential exhaustion is a configuration problem and cancellation
    /// is the caller's decision; neither improves with another model.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::AttemptTimeout { .. })
    }
}
