use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use turnstile_keys::Credential;

use crate::error::DispatchError;

/// Message role in a completion conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation message sent upstream
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Streamed completion output
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, DispatchError>> + Send>>;

/// The upstream completion service, seen through one model and one
/// credential at a time
///
/// Implementations perform the actual network call; the dispatcher owns
/// timeouts, cancellation, and fallback.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streamed completion
    async fn complete_stream(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        credential: &Credential,
    ) -> Result<ChunkStream, DispatchError>;
}
