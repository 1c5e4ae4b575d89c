//! Language-generation backend for the dialog engine
//!
//! Features:
//! - `LlmBackend` seam the response generator calls through
//! - OpenAI-compatible chat completions (OpenAI, OpenRouter, local servers)
//! - Profile-aware sampling parameters

pub mod backend;
pub mod prompt;

pub use backend::{
    FinishReason, GenerationParams, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig,
};
pub use prompt::{Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
