use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's message. Required and non-empty.
    #[serde(default)]
    pub message: Option<String>,
    /// Provider model to use; the relay's default model when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "gpt-4o-mini")]
    pub model: Option<String>,
}

/// Body returned by `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Generated text, trimmed
    pub response: String,
}
