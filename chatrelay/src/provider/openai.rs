use super::{
    CompletionProvider, ProviderError,
    models::{ChatCompletionRequest, ChatCompletionResponse, ProviderErrorBody},
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

/// reqwest implementation of [`CompletionProvider`] for OpenAI-compatible APIs.
pub struct OpenAiProvider {
    client: Client,
    completions_url: Url,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create provider HTTP client: {}", e))?;

        let completions_url = ensure_slash(&config.base_url)
            .join("chat/completions")
            .map_err(|e| anyhow::anyhow!("Failed to construct completions URL: {}", e))?;

        Ok(Self {
            client,
            completions_url,
            api_key: config.api_key.clone(),
        })
    }
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` replaces the last path segment unless the base ends in '/', so
/// `https://host/v1` joined with `chat/completions` would otherwise lose the `v1`.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// Pull the human-readable message out of a provider error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        debug!("Sending chat completion to {}", self.completions_url);

        let mut http_request = self.client.post(self.completions_url.clone()).json(request);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Provider rejected chat completion with status {}", status);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str::<ChatCompletionResponse>(&body).map_err(|e| {
            tracing::error!("Failed to parse provider response as JSON. Error: {}", e);
            ProviderError::Decode(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::models::ChatMessage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let config = ProviderConfig {
            base_url: Url::parse(&format!("{}/v1", server.uri())).unwrap(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        OpenAiProvider::new(&config).unwrap()
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::system("You are a helpful AI assistant."), ChatMessage::user("Hello")],
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[test]
    fn test_ensure_slash() {
        let url = Url::parse("https://api.openai.com/v1").unwrap();
        assert_eq!(ensure_slash(&url).as_str(), "https://api.openai.com/v1/");

        let url = Url::parse("https://api.openai.com/v1/").unwrap();
        assert_eq!(ensure_slash(&url).as_str(), "https://api.openai.com/v1/");
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(error_message("upstream unavailable\n"), "upstream unavailable");
        assert_eq!(error_message(""), "empty response body");
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.7,
                "max_tokens": 1000,
                "messages": [
                    { "role": "system", "content": "You are a helpful AI assistant." },
                    { "role": "user", "content": "Hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-123",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Hi there!" },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server).complete(&request()).await.unwrap();
        assert_eq!(response.first_content(), Some("Hi there!"));
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        match err {
            ProviderError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn test_complete_unreachable() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        drop(server);

        let err = provider.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
