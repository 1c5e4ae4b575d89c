//! Dialog orchestration engine for outbound cold calls
//!
//! Features:
//! - Per-call dialog sessions with turn and age limits
//! - Stage management with two selectable profiles (event-driven, turn ladder)
//! - Prompt assembly over a bounded history window
//! - Generated replies with a scripted fallback and an explicit termination policy
//! - Inbound event dispatch and per-call analytics

pub mod orchestrator;
pub mod prompt;
pub mod response;
pub mod session;
pub mod stage;

mod error;

pub use error::AgentError;
pub use orchestrator::{
    DialogEvent, DialogOrchestrator, InboundEvent, OrchestratorConfig, ResponseEnvelope,
    ResponsePayload, SessionAnalytics, SessionSnapshot, TurnPayload, TurnReply, TurnResult,
};
pub use prompt::{DialogPromptBuilder, PromptExtras};
pub use response::{
    FallbackInput, FallbackPolicy, FallbackReason, GeneratedReply, ReplyRequest, ReplySource,
    ResponseGenerator, TerminationPolicy,
};
pub use session::{DialogSession, FlowEntry, SessionLimits, SessionStore, SessionSummary};
pub use stage::{
    resolver_for, EventDrivenResolver, LadderPhase, StageDecision, StageInput, StageResolver,
    TurnLadderResolver,
};

use std::sync::Arc;

use cold_call_config::{DialogProfile, LlmSettings};
use cold_call_llm::{LlmBackend, OpenAIBackend, OpenAIConfig};

/// Generation backend for the settings, `None` when generation is disabled
pub fn build_backend(
    settings: &LlmSettings,
    profile: DialogProfile,
) -> Result<Option<Arc<dyn LlmBackend>>, AgentError> {
    if !settings.enabled {
        tracing::info!("Generation disabled, replies are scripted");
        return Ok(None);
    }

    let backend = OpenAIBackend::new(OpenAIConfig::from_settings(settings, profile))?;
    Ok(Some(Arc::new(backend)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_backend() {
        let disabled = LlmSettings {
            enabled: false,
            ..LlmSettings::default()
        };
        assert!(build_backend(&disabled, DialogProfile::EventDriven).unwrap().is_none());

        let missing_key = LlmSettings::default();
        assert!(matches!(
            build_backend(&missing_key, DialogProfile::EventDriven),
            Err(AgentError::Llm(_))
        ));

        let local = LlmSettings {
            endpoint: "http://localhost:11434/v1".to_string(),
            ..LlmSettings::default()
        };
        let backend = build_backend(&local, DialogProfile::TurnLadder).unwrap().unwrap();
        assert_eq!(backend.model_name(), "gpt-3.5-turbo");
    }
}
