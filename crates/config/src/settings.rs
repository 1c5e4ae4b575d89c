//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, warnings only
    #[default]
    Development,
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Dialog engine limits and profile
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Generation backend
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    /// Finished call records
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_dialog()?;
        self.validate_llm()?;
        self.validate_collaborators()?;
        Ok(())
    }

    /// Effective prompt history window for the active profile
    pub fn history_window(&self) -> usize {
        self.dialog
            .history_window
            .unwrap_or_else(|| self.dialog.profile.default_history_window())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port cannot be 0"));
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.timeout_seconds",
                "Timeout must be at least 1 second",
            ));
        }

        if server.sweep_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.sweep_interval_seconds",
                "Sweep interval must be at least 1 second",
            ));
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 Only localhost will be allowed."
            );
        }

        Ok(())
    }

    fn validate_dialog(&self) -> Result<(), ConfigError> {
        let dialog = &self.dialog;

        if dialog.max_turns == 0 {
            return Err(ConfigError::invalid(
                "dialog.max_turns",
                "Must allow at least 1 turn",
            ));
        }

        if dialog.max_session_seconds == 0 {
            return Err(ConfigError::invalid(
                "dialog.max_session_seconds",
                "Must be at least 1 second",
            ));
        }

        if dialog.history_window == Some(0) {
            return Err(ConfigError::invalid(
                "dialog.history_window",
                "Window must keep at least 1 turn",
            ));
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        let profile = self.dialog.profile;

        if llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens", "Must be at least 1"));
        }

        if llm.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "llm.timeout_ms",
                "Generation timeout must be at least 1 ms",
            ));
        }

        let temperature = llm.temperature_for(profile);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", temperature),
            ));
        }

        for (field, value) in [
            ("llm.presence_penalty", llm.presence_penalty_for(profile)),
            ("llm.frequency_penalty", llm.frequency_penalty_for(profile)),
        ] {
            if !(-2.0..=2.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("Must be between -2.0 and 2.0, got {}", value),
                ));
            }
        }

        if self.environment.is_strict() && llm.enabled && llm.api_key.is_none() {
            tracing::warn!(
                endpoint = %llm.endpoint,
                "Generation backend enabled without an API key; every turn will use scripted replies"
            );
        }

        Ok(())
    }

    fn validate_collaborators(&self) -> Result<(), ConfigError> {
        if self.telephony.enabled && self.telephony.api_key.is_none() {
            return Err(ConfigError::invalid(
                "telephony.api_key",
                "API key must be set when telephony is enabled",
            ));
        }

        if self.speech.tts_enabled && self.speech.api_key.is_none() {
            return Err(ConfigError::invalid(
                "speech.api_key",
                "API key must be set when speech synthesis is enabled",
            ));
        }

        if self.persistence.enabled && self.persistence.database_path.trim().is_empty() {
            return Err(ConfigError::invalid(
                "persistence.database_path",
                "Database path cannot be empty when persistence is enabled",
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// How often expired dialog sessions are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8004
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_sweep_interval() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

/// Which dialog-management profile drives stage transitions and fallback scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogProfile {
    /// Stage advances on objections, contacts and quote requests
    #[default]
    EventDriven,
    /// Stage follows a fixed ladder over the completed turn count
    TurnLadder,
}

impl DialogProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogProfile::EventDriven => "event_driven",
            DialogProfile::TurnLadder => "turn_ladder",
        }
    }

    pub fn default_history_window(&self) -> usize {
        match self {
            DialogProfile::EventDriven => 5,
            DialogProfile::TurnLadder => 10,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            DialogProfile::EventDriven => "gpt-4",
            DialogProfile::TurnLadder => "gpt-3.5-turbo",
        }
    }

    pub fn default_temperature(&self) -> f32 {
        match self {
            DialogProfile::EventDriven => 0.7,
            DialogProfile::TurnLadder => 0.9,
        }
    }

    /// Presence and frequency penalty share one default
    pub fn default_penalty(&self) -> f32 {
        match self {
            DialogProfile::EventDriven => 0.1,
            DialogProfile::TurnLadder => 0.3,
        }
    }
}

/// Dialog engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    #[serde(default)]
    pub profile: DialogProfile,

    /// Completed exchanges after which the session closes
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Maximum session age and idle time
    #[serde(default = "default_max_session_seconds")]
    pub max_session_seconds: u64,

    /// Turns submitted to the generation backend; profile default when unset
    #[serde(default)]
    pub history_window: Option<usize>,

    /// YAML file with the dialog domain tables; compiled defaults when unset
    #[serde(default)]
    pub domain_path: Option<String>,
}

fn default_max_turns() -> u32 {
    50
}
fn default_max_session_seconds() -> u64 {
    3600
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            profile: DialogProfile::default(),
            max_turns: default_max_turns(),
            max_session_seconds: default_max_session_seconds(),
            history_window: None,
            domain_path: None,
        }
    }
}

/// Generation backend configuration
///
/// Sampling parameters left unset take the active profile's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Disabled means every turn uses scripted replies
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible base URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Should be set via COLD_CALL__LLM__API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub presence_penalty: Option<f32>,

    #[serde(default)]
    pub frequency_penalty: Option<f32>,

    /// Per-turn generation deadline
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra request headers (e.g. router attribution headers)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_tokens() -> u32 {
    150
}
fn default_llm_timeout_ms() -> u64 {
    8000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            presence_penalty: None,
            frequency_penalty: None,
            timeout_ms: default_llm_timeout_ms(),
            headers: HashMap::new(),
        }
    }
}

impl LlmSettings {
    pub fn model_for(&self, profile: DialogProfile) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| profile.default_model().to_string())
    }

    pub fn temperature_for(&self, profile: DialogProfile) -> f32 {
        self.temperature.unwrap_or_else(|| profile.default_temperature())
    }

    pub fn presence_penalty_for(&self, profile: DialogProfile) -> f32 {
        self.presence_penalty.unwrap_or_else(|| profile.default_penalty())
    }

    pub fn frequency_penalty_for(&self, profile: DialogProfile) -> f32 {
        self.frequency_penalty.unwrap_or_else(|| profile.default_penalty())
    }
}

/// Telephony platform (scenario-based call placement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_telephony_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub application_id: String,

    #[serde(default)]
    pub scenario_name: String,

    /// Takes precedence over `rule_id`
    #[serde(default)]
    pub rule_name: Option<String>,

    #[serde(default)]
    pub rule_id: Option<u64>,

    /// Where the call scenario posts recognized text
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_telephony_endpoint() -> String {
    "https://api.voximplant.com/platform_api".to_string()
}
fn default_language() -> String {
    "ru-RU".to_string()
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_telephony_endpoint(),
            account_id: String::new(),
            api_key: None,
            application_id: String::new(),
            scenario_name: String::new(),
            rule_name: None,
            rule_id: None,
            webhook_url: None,
            language: default_language(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub tts_enabled: bool,

    #[serde(default = "default_tts_endpoint")]
    pub tts_endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    #[serde(default = "default_audio_format")]
    pub format: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_tts_timeout")]
    pub timeout_seconds: u64,
}

fn default_tts_endpoint() -> String {
    "https://tts.api.cloud.yandex.net/speech/v1/tts:synthesize".to_string()
}
fn default_voice() -> String {
    "alena".to_string()
}
fn default_audio_format() -> String {
    "oggopus".to_string()
}
fn default_sample_rate() -> u32 {
    48000
}
fn default_tts_timeout() -> u64 {
    15
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tts_enabled: false,
            tts_endpoint: default_tts_endpoint(),
            api_key: None,
            default_voice: default_voice(),
            format: default_audio_format(),
            sample_rate_hz: default_sample_rate(),
            language: default_language(),
            timeout_seconds: default_tts_timeout(),
        }
    }
}

/// Call record storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Disabled means finished calls are only logged
    #[serde(default)]
    pub enabled: bool,

    /// SQLite database file, `:memory:` for tests
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    "data/calls.db".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_path: default_database_path(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (COLD_CALL__ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("COLD_CALL")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8004);
        assert_eq!(settings.dialog.profile, DialogProfile::EventDriven);
        assert_eq!(settings.dialog.max_turns, 50);
        assert_eq!(settings.dialog.max_session_seconds, 3600);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_profile_defaults() {
        let mut settings = Settings::default();
        assert_eq!(settings.history_window(), 5);
        assert_eq!(settings.llm.model_for(settings.dialog.profile), "gpt-4");
        assert_eq!(settings.llm.temperature_for(DialogProfile::EventDriven), 0.7);

        settings.dialog.profile = DialogProfile::TurnLadder;
        assert_eq!(settings.history_window(), 10);
        assert_eq!(settings.llm.model_for(settings.dialog.profile), "gpt-3.5-turbo");
        assert_eq!(settings.llm.presence_penalty_for(DialogProfile::TurnLadder), 0.3);

        settings.dialog.history_window = Some(7);
        settings.llm.temperature = Some(0.2);
        assert_eq!(settings.history_window(), 7);
        assert_eq!(settings.llm.temperature_for(DialogProfile::TurnLadder), 0.2);
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();

        settings.server.port = 0;
        assert!(settings.validate_server().is_err());
        settings.server.port = 8004;

        settings.server.sweep_interval_seconds = 0;
        assert!(settings.validate_server().is_err());
        settings.server.sweep_interval_seconds = 60;

        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn test_dialog_validation() {
        let mut settings = Settings::default();

        settings.dialog.max_turns = 0;
        assert!(settings.validate_dialog().is_err());
        settings.dialog.max_turns = 3;

        settings.dialog.history_window = Some(0);
        assert!(settings.validate_dialog().is_err());
        settings.dialog.history_window = None;

        settings.dialog.max_session_seconds = 0;
        assert!(settings.validate_dialog().is_err());
    }

    #[test]
    fn test_llm_validation() {
        let mut settings = Settings::default();

        settings.llm.temperature = Some(2.5);
        assert!(settings.validate_llm().is_err());
        settings.llm.temperature = Some(0.9);

        settings.llm.frequency_penalty = Some(-3.0);
        assert!(settings.validate_llm().is_err());
        settings.llm.frequency_penalty = None;

        settings.llm.timeout_ms = 0;
        assert!(settings.validate_llm().is_err());
        settings.llm.timeout_ms = 100;

        assert!(settings.validate_llm().is_ok());
    }

    #[test]
    fn test_collaborator_validation() {
        let mut settings = Settings::default();

        settings.telephony.enabled = true;
        assert!(settings.validate_collaborators().is_err());
        settings.telephony.api_key = Some("key".to_string());
        assert!(settings.validate_collaborators().is_ok());

        settings.speech.tts_enabled = true;
        assert!(settings.validate_collaborators().is_err());
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let yaml = r#"
dialog:
  profile: turn_ladder
  max_turns: 3
llm:
  enabled: false
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.dialog.profile, DialogProfile::TurnLadder);
        assert_eq!(settings.dialog.max_turns, 3);
        assert!(!settings.llm.enabled);
        assert_eq!(settings.server.port, 8004);
    }
}
