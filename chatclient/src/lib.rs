//! # chatclient: state and transport for the chat UI
//!
//! The browser-facing half of chatrelay, without any rendering. A view layer drives a
//! [`ChatSession`] with user actions and redraws from [`ChatSession::turns`] and the indicator
//! getters.
//!
//! - **[`conversation`]**: the ordered list of turns, seeded with a greeting
//! - **[`transport`]**: the [`RelayApi`] seam and its reqwest implementation
//! - **[`speech`]**: optional dictation through an injected [`SpeechRecognizer`]
//! - **[`session`]**: send, upload, listen and key handling
//!
//! ```ignore
//! let session = ChatSession::connect(ClientConfig::default())?;
//! session.set_input("Hello");
//! session.send_message().await;
//! ```
//!
//! Every action appends a visible turn on failure instead of returning an error, and the busy,
//! uploading and listening indicators are always cleared when the action finishes.

pub mod conversation;
pub mod session;
pub mod speech;
pub mod transport;

pub use conversation::{Conversation, ConversationTurn, Role, TurnId};
pub use session::{ChatSession, ClientConfig, FileInput, KeyDisposition, KeyPress, ListenOutcome, SendOutcome, UploadOutcome};
pub use speech::{RecognitionOptions, SpeechError, SpeechRecognizer};
pub use transport::{ChatRequest, ChatResponse, ClientError, HttpRelay, MockRelay, RelayApi, SelectedFile, UploadResponse};
