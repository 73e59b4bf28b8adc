//! The chat UI's controller.
//!
//! A [`ChatSession`] owns the conversation and the text input, and turns user actions (send,
//! attach a file, dictate, key presses) into relay calls and new turns. Views render
//! [`ChatSession::turns`] and the indicator getters; nothing here draws anything.
//!
//! Session state lives behind a `parking_lot::Mutex` that is never held across an `.await`, so a
//! session can be shared between tasks. The busy, uploading and listening indicators are atomics
//! set through scope guards and are cleared on every exit path. The same goes for the uploading
//! placeholder turn.

use crate::conversation::{Conversation, ConversationTurn, Role, TurnId};
use crate::speech::{RecognitionOptions, SpeechRecognizer};
use crate::transport::{ChatRequest, ClientError, HttpRelay, RelayApi, SelectedFile};
use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, warn};
use url::Url;

/// Shown when the relay answered with an empty reply.
pub const NO_RESPONSE: &str = "No response.";
/// Shown when a chat call failed for any reason.
pub const CONNECTION_ERROR: &str = "⚠️ Error connecting to server.";
/// Temporary turn shown while an upload is in flight.
pub const UPLOADING_PLACEHOLDER: &str = "📄 Uploading file...";
/// Shown when an upload failed for any reason.
pub const UPLOAD_FAILED: &str = "⚠️ File upload failed.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the relay is served
    pub base_url: Url,
    /// Model named in every chat request; empty leaves the choice to the relay
    pub model: String,
    pub speech: RecognitionOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:3001").expect("default relay URL is valid"),
            model: "gpt-4o-mini".to_string(),
            speech: RecognitionOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The input was empty or whitespace; nothing happened
    Ignored,
    /// Another send is still waiting for its reply; the input was left alone
    Busy,
    /// The message was sent and this assistant turn was appended
    Sent(TurnId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    NoFile,
    Uploaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// No recognizer is available in this environment
    Unavailable,
    AlreadyListening,
    /// The transcript was written into the input
    Transcribed(String),
    NoSpeech,
    Failed,
}

/// The file picker backing the attach button.
#[derive(Debug, Default)]
pub struct FileInput {
    selected: Option<SelectedFile>,
}

impl FileInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, file: SelectedFile) {
        self.selected = Some(file);
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    /// Clear the selection so the same file can be picked again.
    pub fn reset(&mut self) {
        self.selected = None;
    }
}

/// A key event from the message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// DOM-style key name, e.g. `"Enter"` or `"a"`
    pub key: String,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            shift: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The key was handled; suppress the default action (a newline)
    PreventDefault,
    Default,
}

struct SessionState {
    conversation: Conversation,
    input: String,
}

type Indicator<'a> = ScopeGuard<&'a AtomicBool, fn(&AtomicBool)>;

fn lower(flag: &AtomicBool) {
    flag.store(false, Ordering::Release);
}

/// Raise `flag` unless it is already up. The returned guard lowers it again.
fn raise(flag: &AtomicBool) -> Option<Indicator<'_>> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .ok()
        .map(|_| scopeguard::guard(flag, lower as fn(&AtomicBool)))
}

pub struct ChatSession {
    relay: Arc<dyn RelayApi>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    config: ClientConfig,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    uploads_in_flight: AtomicUsize,
    listening: AtomicBool,
}

impl ChatSession {
    pub fn new(relay: Arc<dyn RelayApi>, config: ClientConfig) -> Self {
        Self {
            relay,
            recognizer: None,
            config,
            state: Mutex::new(SessionState {
                conversation: Conversation::new(),
                input: String::new(),
            }),
            busy: AtomicBool::new(false),
            uploads_in_flight: AtomicUsize::new(0),
            listening: AtomicBool::new(false),
        }
    }

    /// A session talking to the relay at `config.base_url` over HTTP.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let relay = HttpRelay::new(config.base_url.clone())?;
        Ok(Self::new(Arc::new(relay), config))
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.state.lock().conversation.turns().to_vec()
    }

    pub fn input(&self) -> String {
        self.state.lock().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.state.lock().input = text.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads_in_flight.load(Ordering::Acquire) > 0
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Whether dictation can be offered at all.
    pub fn speech_available(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Send the current input as a user turn and append the assistant's reply.
    pub async fn send_message(&self) -> SendOutcome {
        let (message, _busy) = {
            let mut state = self.state.lock();
            if state.input.trim().is_empty() {
                return SendOutcome::Ignored;
            }
            let Some(busy) = raise(&self.busy) else {
                return SendOutcome::Busy;
            };
            let message = std::mem::take(&mut state.input);
            state.conversation.push(Role::User, message.clone());
            (message, busy)
        };

        let request = ChatRequest {
            message,
            model: Some(self.config.model.clone()).filter(|model| !model.is_empty()),
        };

        let reply = match self.relay.chat(&request).await {
            Ok(response) if response.response.is_empty() => NO_RESPONSE.to_string(),
            Ok(response) => response.response,
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                CONNECTION_ERROR.to_string()
            }
        };

        let id = self.state.lock().conversation.push(Role::Assistant, reply);
        SendOutcome::Sent(id)
    }

    /// Upload the file selected in `input`, if any, and append the analysis.
    ///
    /// The uploading placeholder is removed on every exit path, including cancellation, and the
    /// selection is cleared whatever the outcome.
    pub async fn handle_file_upload(&self, input: &mut FileInput) -> UploadOutcome {
        let Some(file) = input.selected.take() else {
            return UploadOutcome::NoFile;
        };

        self.uploads_in_flight.fetch_add(1, Ordering::AcqRel);
        let _uploading = scopeguard::guard(&self.uploads_in_flight, |count| {
            count.fetch_sub(1, Ordering::AcqRel);
        });

        let id = self
            .state
            .lock()
            .conversation
            .push(Role::Assistant, UPLOADING_PLACEHOLDER);
        // Removed by id if this future is dropped before the relay answers
        let placeholder = scopeguard::guard(id, |id| {
            self.state.lock().conversation.remove(id);
        });

        let result = self.relay.upload(&file).await;

        let mut state = self.state.lock();
        state.conversation.remove(ScopeGuard::into_inner(placeholder));
        let outcome = match result {
            Ok(response) => {
                state
                    .conversation
                    .push(Role::Assistant, format!("📄 **File uploaded:** {}", response.file_name));
                state.conversation.push(Role::Assistant, response.response);
                UploadOutcome::Uploaded
            }
            Err(e) => {
                warn!(file_name = %file.name, error = %e, "File upload failed");
                state.conversation.push(Role::Assistant, UPLOAD_FAILED);
                UploadOutcome::Failed
            }
        };
        drop(state);

        input.reset();
        outcome
    }

    /// Run one dictation attempt and put the transcript into the input. Never sends.
    pub async fn start_listening(&self) -> ListenOutcome {
        let Some(recognizer) = self.recognizer.as_ref() else {
            return ListenOutcome::Unavailable;
        };
        let Some(_listening) = raise(&self.listening) else {
            return ListenOutcome::AlreadyListening;
        };

        match recognizer.recognize(&self.config.speech).await {
            Ok(Some(transcript)) => {
                debug!(len = transcript.len(), "Speech recognized");
                self.set_input(transcript.clone());
                ListenOutcome::Transcribed(transcript)
            }
            Ok(None) => ListenOutcome::NoSpeech,
            Err(e) => {
                warn!(error = %e, "Speech recognition failed");
                ListenOutcome::Failed
            }
        }
    }

    /// Enter sends; Shift+Enter and every other key keep their default behaviour.
    pub async fn on_key_down(&self, key: KeyPress) -> KeyDisposition {
        if key.key == "Enter" && !key.shift {
            self.send_message().await;
            KeyDisposition::PreventDefault
        } else {
            KeyDisposition::Default
        }
    }
}
