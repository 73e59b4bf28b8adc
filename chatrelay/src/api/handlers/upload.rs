use crate::AppState;
use crate::api::models::upload::UploadResponse;
use crate::errors::{Error, ErrorResponse, Result};
use crate::uploads::{multipart_error, store_field};
use axum::{
    Json,
    extract::{Multipart, State},
};

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    summary = "Analyse an uploaded file",
    description = "Accept a single file in the `file` field, send its text content to the default model for analysis, and delete the stored copy before responding.",
    request_body(
        content_type = "multipart/form-data",
        description = "Multipart form with one `file` field"
    ),
    responses(
        (status = 200, description = "File analysed", body = UploadResponse),
        (status = 400, description = "No file uploaded or malformed multipart body", body = ErrorResponse),
        (status = 413, description = "File exceeds the configured size limit", body = ErrorResponse),
        (status = 500, description = "Provider, network or filesystem failure", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if upload.is_some() || field.name() != Some("file") {
            continue;
        }
        // A part without a filename is a plain form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        upload = Some(store_field(field, file_name, &state.config.uploads).await?);
    }

    let upload = upload.ok_or_else(|| Error::bad_request("No file uploaded"))?;

    tracing::info!(
        file_name = %upload.original_name(),
        size = upload.size(),
        "Received file for analysis"
    );

    let content = upload.read_text().await?;
    let result = state.relay.analyze_file(&content).await;

    let file_name = upload.original_name().to_string();
    // Remove the stored copy before replying, whatever the provider said.
    upload.remove().await;

    Ok(Json(UploadResponse {
        file_name,
        response: result?,
    }))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::test_utils::{completion_body, create_test_app, create_test_config};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_upload_dir(provider: &MockServer, dir: &TempDir) -> Config {
        let mut config = create_test_config(&format!("{}/v1", provider.uri()));
        config.uploads.dir = dir.path().join("uploads");
        config
    }

    fn is_empty(dir: &Path) -> bool {
        // Never created counts as empty
        match std::fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_analyses_file_and_cleans_up() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "You are a helpful AI assistant." },
                    { "role": "user", "content": "Analyze this file content:\n\nX" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(" A one-letter note. ")))
            .expect(1)
            .mount(&provider)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_with_upload_dir(&provider, &dir);
        let upload_dir = config.uploads.dir.clone();
        let server = create_test_app(config);

        let response = server
            .post("/api/upload")
            .multipart(MultipartForm::new().add_part("file", Part::bytes("X".as_bytes()).file_name("notes.txt")))
            .await;

        response.assert_status(StatusCode::OK);
        response.assert_json(&json!({ "fileName": "notes.txt", "response": "A one-letter note." }));
        assert!(is_empty(&upload_dir));
    }

    #[tokio::test]
    async fn test_upload_ignores_model_field() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&provider)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let server = create_test_app(config_with_upload_dir(&provider, &dir));

        let response = server
            .post("/api/upload")
            .multipart(
                MultipartForm::new()
                    .add_text("model", "gpt-4o")
                    .add_part("file", Part::bytes("hello".as_bytes()).file_name("hello.txt")),
            )
            .await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_provider_failure_still_cleans_up() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "The server had an error while processing your request" }
            })))
            .expect(1)
            .mount(&provider)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_with_upload_dir(&provider, &dir);
        let upload_dir = config.uploads.dir.clone();
        let server = create_test_app(config);

        let response = server
            .post("/api/upload")
            .multipart(MultipartForm::new().add_part("file", Part::bytes("X".as_bytes()).file_name("notes.txt")))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = response.json();
        assert!(json["error"].as_str().unwrap().contains("The server had an error"));
        assert!(is_empty(&upload_dir));
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unreachable")))
            .expect(0)
            .mount(&provider)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let server = create_test_app(config_with_upload_dir(&provider, &dir));

        let response = server
            .post("/api/upload")
            .multipart(MultipartForm::new().add_text("note", "no file here"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No file uploaded" }));
    }

    #[tokio::test]
    async fn test_upload_file_field_without_filename() {
        let provider = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let server = create_test_app(config_with_upload_dir(&provider, &dir));

        let response = server
            .post("/api/upload")
            .multipart(MultipartForm::new().add_text("file", "just text"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No file uploaded" }));
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unreachable")))
            .expect(0)
            .mount(&provider)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_upload_dir(&provider, &dir);
        config.uploads.max_file_size = 16;
        let upload_dir = config.uploads.dir.clone();
        let server = create_test_app(config);

        let response = server
            .post("/api/upload")
            .multipart(MultipartForm::new().add_part("file", Part::bytes(vec![b'a'; 64]).file_name("big.txt")))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let json: Value = response.json();
        assert!(json["error"].as_str().unwrap().contains("16 bytes"));
        assert!(is_empty(&upload_dir));
    }
}
