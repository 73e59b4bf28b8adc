//! Upstream completion provider.
//!
//! The relay talks to exactly one OpenAI-compatible provider. [`CompletionProvider`] is the seam
//! the request handlers depend on; [`OpenAiProvider`] is the reqwest-backed implementation created
//! once at start-up and shared by every request.

pub mod models;
mod openai;

use async_trait::async_trait;
use thiserror::Error as ThisError;

pub use models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Role};
pub use openai::OpenAiProvider;

/// Failure talking to the provider.
#[derive(ThisError, Debug)]
pub enum ProviderError {
    /// Connection, TLS or timeout failure
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider answered 2xx with a body that is not a chat completion
    #[error("Failed to parse provider response: {0}")]
    Decode(String),
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError>;
}
