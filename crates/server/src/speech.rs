//! Speech synthesis over the cloud TTS HTTP API

use std::time::Duration;

use async_trait::async_trait;
use cold_call_config::SpeechConfig;
use cold_call_core::{CollaboratorError, EmotionHint, TextToSpeech};

pub struct HttpTextToSpeech {
    client: reqwest::Client,
    config: SpeechConfig,
    api_key: String,
}

impl HttpTextToSpeech {
    pub fn new(config: SpeechConfig) -> Result<Self, CollaboratorError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CollaboratorError::NotConfigured("speech.api_key".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn default_voice(&self) -> &str {
        &self.config.default_voice
    }
}

/// Voice style understood by the synthesizer
fn express_as(emotion: EmotionHint) -> &'static str {
    match emotion {
        EmotionHint::Positive => "good",
        EmotionHint::Negative => "evil",
        EmotionHint::Neutral => "neutral",
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Short pauses around the text, styled by emotion
fn ssml(text: &str, voice: &str, emotion: EmotionHint) -> String {
    format!(
        "<speak version='1.0'><voice name='{}'><express-as type='{}'>\
         <break time='200ms'/> {} <break time='150ms'/></express-as></voice></speak>",
        escape_xml(voice),
        express_as(emotion),
        escape_xml(text.trim())
    )
}

#[async_trait]
impl TextToSpeech for HttpTextToSpeech {
    async fn synthesize(&self, text: &str, voice: &str, emotion: EmotionHint) -> Option<Vec<u8>> {
        if text.trim().is_empty() {
            return None;
        }
        let voice = if voice.trim().is_empty() {
            self.config.default_voice.as_str()
        } else {
            voice
        };

        let form = [
            ("ssml", ssml(text, voice, emotion)),
            ("voice", voice.to_string()),
            ("format", self.config.format.clone()),
            ("sampleRateHertz", self.config.sample_rate_hz.to_string()),
            ("lang", self.config.language.clone()),
        ];

        let response = match self
            .client
            .post(&self.config.tts_endpoint)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, voice = %voice, "Speech synthesis request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Speech synthesis rejected");
            return None;
        }

        match response.bytes().await {
            Ok(audio) if !audio.is_empty() => {
                tracing::debug!(
                    bytes = audio.len(),
                    voice = %voice,
                    emotion = %emotion.as_str(),
                    "Synthesized reply"
                );
                Some(audio.to_vec())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read synthesized audio");
                None
            }
        }
    }
}
