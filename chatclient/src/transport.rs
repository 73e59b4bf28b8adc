//! Calls to the relay API.
//!
//! [`RelayApi`] abstracts the two calls the chat UI makes so the session logic can be tested
//! without a running relay. [`HttpRelay`] is the reqwest implementation; [`MockRelay`] replays
//! queued results and records what it was asked.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{debug, instrument};
use url::Url;

#[derive(ThisError, Debug)]
pub enum ClientError {
    /// The relay could not be reached or its response could not be read
    #[error("Failed to reach relay: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered with a non-success status
    #[error("Relay returned {status}: {message}")]
    Relay { status: u16, message: String },

    #[error("Invalid relay URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Empty when the relay sent no `response` field
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_name: String,
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// A file picked by the user, held in memory until it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// MIME type reported by the picker, if any
    pub mime: Option<String>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk, naming it after the last path component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }
}

#[async_trait]
pub trait RelayApi: Send + Sync {
    /// `POST /api/chat`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    /// `POST /api/upload` with the file in the multipart field `file`
    async fn upload(&self, file: &SelectedFile) -> Result<UploadResponse, ClientError>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

#[derive(Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRelay {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: ensure_slash(base_url),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

/// `Url::join` drops the last segment of a base without a trailing slash.
fn ensure_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Decode a success body, or turn an error status into [`ClientError::Relay`].
async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    };
    tracing::warn!(status = status.as_u16(), message = %message, "Relay request failed");

    Err(ClientError::Relay {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RelayApi for HttpRelay {
    #[instrument(skip_all)]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = self.endpoint("api/chat")?;
        debug!(url = %url, "Sending chat message");

        let response = self.client.post(url).json(request).send().await?;
        read_response(response).await
    }

    #[instrument(skip_all, fields(file_name = %file.name, size = file.bytes.len()))]
    async fn upload(&self, file: &SelectedFile) -> Result<UploadResponse, ClientError> {
        let url = self.endpoint("api/upload")?;
        debug!(url = %url, "Uploading file");

        let mut part = reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(mime) = &file.mime {
            part = part.mime_str(mime)?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        read_response(response).await
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

/// Relay double that returns queued results in FIFO order.
///
/// A call with nothing queued fails with a 500 [`ClientError::Relay`].
#[derive(Clone, Default)]
pub struct MockRelay {
    chat_results: Arc<Mutex<VecDeque<Result<ChatResponse, ClientError>>>>,
    upload_results: Arc<Mutex<VecDeque<Result<UploadResponse, ClientError>>>>,
    chat_calls: Arc<Mutex<Vec<ChatRequest>>>,
    upload_calls: Arc<Mutex<Vec<SelectedFile>>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chat(&self, result: Result<ChatResponse, ClientError>) {
        self.chat_results.lock().push_back(result);
    }

    pub fn push_upload(&self, result: Result<UploadResponse, ClientError>) {
        self.upload_results.lock().push_back(result);
    }

    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.chat_calls.lock().clone()
    }

    pub fn upload_calls(&self) -> Vec<SelectedFile> {
        self.upload_calls.lock().clone()
    }
}

fn nothing_queued(call: &str) -> ClientError {
    ClientError::Relay {
        status: 500,
        message: format!("No mock result queued for {call}"),
    }
}

#[async_trait]
impl RelayApi for MockRelay {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.chat_calls.lock().push(request.clone());
        self.chat_results.lock().pop_front().unwrap_or_else(|| Err(nothing_queued("chat")))
    }

    async fn upload(&self, file: &SelectedFile) -> Result<UploadResponse, ClientError> {
        self.upload_calls.lock().push(file.clone());
        self.upload_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(nothing_queued("upload")))
    }
}
