//! Upstream completion dispatch along a mode's fallback chain
//!
//! The dispatcher walks the configured chain in order, picking a fresh
//! credential per attempt and bounding each attempt by the mode's
//! timeout and every attempt collectively by the global budget. Failures
//! only become user-visible once the chain and budget are exhausted.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod dispatcher;
mod error;
mod provider;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::DispatchError;
pub use provider::{ChatMessage, ChunkStream, CompletionProvider, Role};
