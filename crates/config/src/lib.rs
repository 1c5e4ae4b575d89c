//! Configuration management for the cold-call agent
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`COLD_CALL__` prefix, `__` separator)
//! - Compiled defaults
//!
//! # Dialog domain tables
//!
//! Everything the dialog engine matches against or says out loud lives in
//! [`DialogDomainConfig`]: the call context, objection patterns and rebuttals,
//! entity trigger phrases, sentiment keywords, fallback scripts, termination
//! phrases and prompt templates. It is loaded from a single YAML file named by
//! `dialog.domain_path`, or taken from the compiled defaults.

pub mod domain;
pub mod settings;

pub use domain::{
    CallContext, DialogDomainConfig, EntityRules, FallbackScripts, KeywordReply, LadderScripts,
    ObjectionRule, ObjectionTable, PromptTemplates, ReplyMoodRules, RoleVocabulary,
    SentimentRules, ShortAnswerRule, StageRules, StageScripts, TerminationRules, ToneLabels,
    TurnBucket,
};
pub use settings::{
    load_settings, DialogConfig, DialogProfile, LlmSettings, ObservabilityConfig,
    PersistenceConfig, RuntimeEnvironment, ServerConfig, Settings, SpeechConfig, TelephonyConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
