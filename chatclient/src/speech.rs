//! Optional dictation input.
//!
//! Whether speech recognition exists depends on the host environment, so the session takes it as
//! an injected [`SpeechRecognizer`] and treats its absence as "feature unavailable".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Settings passed to the recognizer for each attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    /// BCP 47 language tag
    pub language: String,
    /// Keep listening after the first utterance
    pub continuous: bool,
    /// Report partial transcripts while the user is still speaking
    pub interim_results: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

#[derive(ThisError, Debug)]
pub enum SpeechError {
    #[error("Microphone access was denied")]
    NotAllowed,

    #[error("No audio input device is available")]
    NoDevice,

    #[error("Speech recognition failed: {0}")]
    Failed(String),
}

/// One recognition attempt per call.
///
/// Returns `Ok(Some(transcript))` for a recognized utterance and `Ok(None)` when the attempt ended
/// without speech.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, options: &RecognitionOptions) -> Result<Option<String>, SpeechError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RecognitionOptions::default();

        assert_eq!(options.language, "en-US");
        assert!(!options.continuous);
        assert!(!options.interim_results);
    }

    #[test]
    fn test_partial_options_fill_defaults() {
        let options: RecognitionOptions = serde_json::from_str(r#"{"language": "en-GB"}"#).unwrap();

        assert_eq!(options.language, "en-GB");
        assert!(!options.continuous);
    }
}
