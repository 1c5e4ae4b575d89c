//! Speech recognition and synthesis traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Recognized text for a chunk of audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Partial results may still change
    pub is_final: bool,
}

/// Streaming speech-to-text session API
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Open a recognition session for a call, returns the session id
    async fn start_session(&self, call_id: &str) -> Result<String>;

    /// Feed raw audio; returns text once the recognizer has something
    async fn feed_audio(&self, session_id: &str, audio: &[u8]) -> Result<Option<Transcript>>;

    async fn end_session(&self, session_id: &str) -> Result<()>;
}

/// Coarse emotional coloring for synthesized speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmotionHint {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl EmotionHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionHint::Positive => "positive",
            EmotionHint::Negative => "negative",
            EmotionHint::Neutral => "neutral",
        }
    }
}

/// Text-to-speech synthesis
///
/// Synthesis is best-effort: any failure yields `None` and the caller decides
/// whether to retry with a different voice or fall back to platform TTS.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, emotion: EmotionHint) -> Option<Vec<u8>>;
}
