use thiserror::Error;

use cold_call_config::ConfigError;
use cold_call_llm::LlmError;
use cold_call_text_processing::TextProcessingError;

/// Errors raised while assembling the dialog engine
///
/// The turn path itself never fails; see `DialogOrchestrator::handle_utterance`.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Pattern table error: {0}")]
    TextProcessing(#[from] TextProcessingError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    Llm(String),
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}
