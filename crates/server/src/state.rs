//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use cold_call_agent::{DialogOrchestrator, OrchestratorConfig};
use cold_call_config::{DialogDomainConfig, Settings};
use cold_call_core::{SpeechToText, Telephony, TextToSpeech};
use cold_call_llm::LlmBackend;
use cold_call_persistence::CallRecordStore;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::{HttpTelephony, HttpTextToSpeech, ServerError};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<DialogOrchestrator>,
    /// Outbound call placement, `None` when telephony is disabled
    pub telephony: Option<Arc<dyn Telephony>>,
    pub tts: Option<Arc<dyn TextToSpeech>>,
    /// Streaming recognition for scenarios that forward raw audio
    pub stt: Option<Arc<dyn SpeechToText>>,
    pub calls: Option<Arc<dyn CallRecordStore>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Bare state: dialog engine only, no collaborators
    pub fn new(config: Settings, orchestrator: Arc<DialogOrchestrator>) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            telephony: None,
            tts: None,
            stt: None,
            calls: None,
            metrics: None,
        }
    }

    /// Engine plus every collaborator the settings enable
    pub fn from_settings(
        config: Settings,
        domain: DialogDomainConfig,
        backend: Option<Arc<dyn LlmBackend>>,
    ) -> Result<Self, ServerError> {
        let greeting = domain
            .scripts
            .event_driven
            .greeting
            .first()
            .cloned()
            .unwrap_or_default();

        let orchestrator = Arc::new(DialogOrchestrator::new(
            OrchestratorConfig::from_settings(&config, domain),
            backend,
        )?);

        let mut state = Self::new(config, orchestrator);

        if state.config.telephony.enabled {
            let telephony = HttpTelephony::new(state.config.telephony.clone(), greeting)?;
            state = state.with_telephony(Arc::new(telephony));
        } else {
            tracing::info!("Telephony disabled, call placement unavailable");
        }

        if state.config.speech.tts_enabled {
            let tts = HttpTextToSpeech::new(state.config.speech.clone())?;
            state = state.with_tts(Arc::new(tts));
        }

        if let Some(calls) = cold_call_persistence::init(&state.config.persistence)? {
            state = state.with_call_store(calls);
        }

        Ok(state)
    }

    pub fn with_telephony(mut self, telephony: Arc<dyn Telephony>) -> Self {
        self.telephony = Some(telephony);
        self
    }

    pub fn with_tts(mut self, tts: Arc<dyn TextToSpeech>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn with_stt(mut self, stt: Arc<dyn SpeechToText>) -> Self {
        self.stt = Some(stt);
        self
    }

    pub fn with_call_store(mut self, calls: Arc<dyn CallRecordStore>) -> Self {
        self.calls = Some(calls);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
