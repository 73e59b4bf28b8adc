//! Prompt construction and reply extraction shared by the chat and upload endpoints.

use crate::config::ProviderConfig;
use crate::provider::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionProvider, ProviderError};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Substituted when the provider answers without usable text.
pub const NO_RESPONSE: &str = "No response generated.";

/// Prefix of the prompt sent for an uploaded file.
pub const FILE_ANALYSIS_PROMPT: &str = "Analyze this file content:\n\n";

/// Forwards prompts to the provider under fixed sampling settings.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn CompletionProvider>,
    settings: ProviderConfig,
}

impl Relay {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: ProviderConfig) -> Self {
        Self { provider, settings }
    }

    /// Answer a user message. An absent or empty `model` falls back to the default.
    #[instrument(skip_all)]
    pub async fn chat(&self, message: &str, model: Option<&str>) -> Result<String, ProviderError> {
        let model = model.filter(|m| !m.is_empty()).unwrap_or(self.settings.default_model.as_str());
        self.complete(model, message).await
    }

    /// Ask the default model to analyse the text content of an uploaded file.
    #[instrument(skip_all, fields(content_len = content.len()))]
    pub async fn analyze_file(&self, content: &str) -> Result<String, ProviderError> {
        let prompt = format!("{FILE_ANALYSIS_PROMPT}{content}");
        self.complete(&self.settings.default_model, &prompt).await
    }

    async fn complete(&self, model: &str, user_content: &str) -> Result<String, ProviderError> {
        let request = self.build_request(model, user_content);
        debug!(model = %request.model, "Forwarding prompt to provider");
        let response = self.provider.complete(&request).await?;
        Ok(extract_reply(&response))
    }

    fn build_request(&self, model: &str, user_content: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(self.settings.system_prompt.clone()),
                ChatMessage::user(user_content),
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

/// First choice's text with surrounding whitespace removed, or [`NO_RESPONSE`].
pub fn extract_reply(response: &ChatCompletionResponse) -> String {
    match response.first_content().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_RESPONSE.to_string(),
    }
}
