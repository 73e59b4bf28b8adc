//! Shared helpers for handler tests.

use crate::config::Config;
use axum_test::TestServer;
use serde_json::{Value, json};
use url::Url;

pub fn create_test_app(config: Config) -> TestServer {
    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}

/// Config pointing the provider at `provider_base_url` (usually a wiremock server plus `/v1`).
pub fn create_test_config(provider_base_url: &str) -> Config {
    // Handler tests that upload override this with their own temp dir
    let upload_dir = std::env::temp_dir().join(format!("chatrelay-test-uploads-{}", std::process::id()));

    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.provider.base_url = Url::parse(provider_base_url).expect("Invalid provider URL in test config");
    config.provider.api_key = Some("sk-test".to_string());
    config.uploads.dir = upload_dir;
    config
}

/// Minimal chat completion body whose first choice says `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}
