//! Dialog orchestrator
//!
//! Entry point of the engine. Each utterance runs through extraction,
//! objection classification, stage resolution and reply generation, and
//! lands in the call's session. Failures never escape: the caller always
//! gets a reply or a structured rejection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use cold_call_config::{DialogDomainConfig, DialogProfile, Settings};
use cold_call_core::{DialogStage, ObjectionCategory, Turn, TurnAnnotation};
use cold_call_llm::{GenerationParams, LlmBackend};
use cold_call_text_processing::{ReplyMood, TextAnalyzers};

use crate::prompt::{DialogPromptBuilder, PromptExtras};
use crate::response::{
    FallbackPolicy, GeneratedReply, ReplyRequest, ReplySource, ResponseGenerator,
    TerminationPolicy,
};
use crate::session::{DialogSession, FlowEntry, SessionLimits, SessionStore, SessionSummary};
use crate::stage::{resolver_for, LadderPhase, StageInput, StageResolver};
use crate::AgentError;

/// Everything needed to assemble the engine
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub profile: DialogProfile,
    pub limits: SessionLimits,
    pub history_window: usize,
    pub params: GenerationParams,
    /// Per-turn generation deadline
    pub llm_timeout: Duration,
    pub domain: DialogDomainConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), DialogDomainConfig::default())
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings, domain: DialogDomainConfig) -> Self {
        let profile = settings.dialog.profile;
        Self {
            profile,
            limits: SessionLimits::from(&settings.dialog),
            history_window: settings.history_window(),
            params: GenerationParams::for_profile(&settings.llm, profile),
            llm_timeout: Duration::from_millis(settings.llm.timeout_ms),
            domain,
        }
    }
}

/// Read-only view of a session after a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub call_id: String,
    pub stage: DialogStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ladder_phase: Option<LadderPhase>,
    pub turn_count: u32,
    pub objections_handled: Vec<ObjectionCategory>,
    pub contacts_found: Vec<String>,
}

impl From<&DialogSession> for SessionSnapshot {
    fn from(session: &DialogSession) -> Self {
        Self {
            call_id: session.call_id().to_string(),
            stage: session.stage(),
            ladder_phase: session.ladder_phase(),
            turn_count: session.turn_count(),
            objections_handled: session.objections_handled().to_vec(),
            contacts_found: session.contacts_found().to_vec(),
        }
    }
}

/// Final picture of a call, taken before its session is dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAnalytics {
    pub call_id: String,
    pub duration_seconds: f64,
    pub turn_count: u32,
    pub stage: DialogStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ladder_phase: Option<LadderPhase>,
    pub objections_handled: Vec<ObjectionCategory>,
    pub contacts_found: Vec<String>,
    /// Tone label of the last utterance
    pub engagement: Option<String>,
    pub history_length: usize,
    pub conversation_flow: Vec<FlowEntry>,
}

impl SessionAnalytics {
    /// Analytics of a call the engine never saw
    pub fn empty(call_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            duration_seconds: 0.0,
            turn_count: 0,
            stage: DialogStage::default(),
            ladder_phase: None,
            objections_handled: Vec::new(),
            contacts_found: Vec::new(),
            engagement: None,
            history_length: 0,
            conversation_flow: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnReply {
    pub text: String,
    pub source: ReplySource,
    pub snapshot: SessionSnapshot,
    /// Coloring for speech synthesis
    pub mood: ReplyMood,
    pub limit_reached: bool,
}

/// Outcome of one utterance
#[derive(Debug, Clone)]
pub enum TurnResult {
    Replied(TurnReply),
    /// Nothing was said; the session is untouched
    Rejected(String),
}

impl TurnResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnResult::Replied(_))
    }

    pub fn reply(&self) -> Option<&TurnReply> {
        match self {
            TurnResult::Replied(reply) => Some(reply),
            TurnResult::Rejected(_) => None,
        }
    }
}

/// Event from the telephony scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event: String,
    #[serde(default)]
    pub call_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub custom_data: Option<Map<String, Value>>,
}

impl InboundEvent {
    pub fn asr_text(call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            event: "asr_text".to_string(),
            call_id: call_id.into(),
            text: Some(text.into()),
            custom_data: None,
        }
    }

    pub fn call_ended(call_id: impl Into<String>) -> Self {
        Self {
            event: "call_ended".to_string(),
            call_id: call_id.into(),
            text: None,
            custom_data: None,
        }
    }
}

/// Reply text with the session fields the scenario needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPayload {
    pub text: String,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Text(String),
    Turn(TurnPayload),
    CallEnded(SessionAnalytics),
}

/// Envelope returned for every inbound event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub response: Option<ResponsePayload>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResponseEnvelope {
    pub fn ok(response: ResponsePayload) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Engine events for observers
#[derive(Debug, Clone)]
pub enum DialogEvent {
    SessionStarted { call_id: String },
    StageChanged {
        call_id: String,
        from: DialogStage,
        to: DialogStage,
    },
    Replied {
        call_id: String,
        text: String,
        source: ReplySource,
    },
    LimitReached { call_id: String },
    SessionEnded { call_id: String, turn_count: u32 },
}

pub struct DialogOrchestrator {
    store: Arc<SessionStore>,
    analyzers: TextAnalyzers,
    resolver: Box<dyn StageResolver>,
    generator: ResponseGenerator,
    profile: DialogProfile,
    /// Serializes events of one call
    call_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    event_tx: broadcast::Sender<DialogEvent>,
}

impl DialogOrchestrator {
    /// Assemble the engine; `backend` is `None` when generation is disabled
    /// or failed to initialize, in which case every reply is scripted
    pub fn new(
        config: OrchestratorConfig,
        backend: Option<Arc<dyn LlmBackend>>,
    ) -> Result<Self, AgentError> {
        let domain = &config.domain;
        domain.validate()?;

        let analyzers = TextAnalyzers::from_domain(domain)?;
        let termination = TerminationPolicy::new(&domain.termination)?;
        let fallback = match config.profile {
            DialogProfile::EventDriven => FallbackPolicy::event_driven(&domain.scripts.event_driven),
            DialogProfile::TurnLadder => FallbackPolicy::turn_ladder(&domain.scripts.turn_ladder),
        };
        let prompts =
            DialogPromptBuilder::new(domain.prompts.clone(), config.profile, config.history_window);

        let generator = ResponseGenerator::new(
            backend,
            config.params.clone(),
            config.llm_timeout,
            prompts,
            fallback,
            termination,
        );

        let (event_tx, _) = broadcast::channel(100);

        tracing::info!(
            profile = %config.profile.as_str(),
            max_turns = config.limits.max_turns,
            history_window = config.history_window,
            generation = generator.has_backend(),
            "Dialog orchestrator ready"
        );

        Ok(Self {
            store: Arc::new(SessionStore::new(config.limits, domain.context.clone())),
            analyzers,
            resolver: resolver_for(config.profile, &domain.stages),
            generator,
            profile: config.profile,
            call_locks: Mutex::new(HashMap::new()),
            event_tx,
        })
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn profile(&self) -> DialogProfile {
        self.profile
    }

    pub fn analyzers(&self) -> &TextAnalyzers {
        &self.analyzers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialogEvent> {
        self.event_tx.subscribe()
    }

    pub fn active_sessions(&self) -> usize {
        self.store.count()
    }

    /// Handle one recognized utterance
    ///
    /// At most one call per `call_id` may be in flight; `handle_event`
    /// enforces that.
    pub async fn handle_utterance(
        &self,
        call_id: &str,
        text: &str,
        custom_data: Map<String, Value>,
    ) -> TurnResult {
        let text = text.trim();
        if text.is_empty() {
            return TurnResult::Rejected("Empty text".to_string());
        }

        self.store.touch(call_id);
        let mut session = self.store.get_or_create(call_id);
        if session.history.is_empty() {
            self.emit(DialogEvent::SessionStarted {
                call_id: call_id.to_string(),
            });
        }

        let entities = self.analyzers.entities.extract(text);
        let classification = self.analyzers.objections.classify(text);
        let tone = self.analyzers.sentiment.analyze(text);

        let new_contacts = session.record_contacts(&entities);
        if let Some(category) = classification.category {
            session.objections_handled.push(category);
        }

        let decision = self.resolver.resolve(&StageInput {
            current: session.stage,
            turn_count: session.turn_count,
            text,
            classification: &classification,
            entities: &entities,
        });
        if decision.stage != session.stage {
            tracing::info!(
                call_id = %call_id,
                from = %session.stage,
                to = %decision.stage,
                "Stage transition"
            );
            self.emit(DialogEvent::StageChanged {
                call_id: call_id.to_string(),
                from: session.stage,
                to: decision.stage,
            });
        }
        session.stage = decision.stage;
        session.ladder_phase = decision.ladder_phase;
        session.last_tone = Some(tone);

        tracing::debug!(
            call_id = %call_id,
            objection = ?classification.category,
            new_contacts,
            tone = %tone,
            "Analyzed utterance"
        );

        session.history.push(Turn::user(text).with_annotation(TurnAnnotation {
            objections: classification.all_matches.clone(),
            entities: entities.clone(),
        }));

        let now = Utc::now();
        if self.store.is_expired(&session, now) {
            let limit_reply = self.generator.termination().limit_reply().to_string();
            session.history.push(Turn::agent(limit_reply.clone()));
            session.last_activity = now;

            tracing::info!(
                call_id = %call_id,
                turn_count = session.turn_count,
                "Session limit reached"
            );
            self.emit(DialogEvent::LimitReached {
                call_id: call_id.to_string(),
            });

            return self.finish_turn(
                session,
                GeneratedReply {
                    text: limit_reply,
                    source: ReplySource::LimitReached,
                },
                true,
            );
        }

        let extras = PromptExtras {
            objection: classification.category,
            tone_label: self.analyzers.sentiment.label(tone).to_string(),
            custom_data,
        };
        let reply = self
            .generator
            .generate(ReplyRequest {
                session: &session,
                utterance: text,
                classification: &classification,
                extras: &extras,
            })
            .await;

        session.history.push(Turn::agent(reply.text.clone()));
        session.turn_count += 1;
        session.last_activity = Utc::now();
        session.conversation_flow.push(FlowEntry {
            turn: session.turn_count,
            stage: session.stage,
            user_input: text.to_string(),
            ai_response: reply.text.clone(),
            objections: classification.all_matches,
            contacts: entities,
            source: reply.source,
        });

        metrics::counter!("dialog_turns_total").increment(1);
        self.finish_turn(session, reply, false)
    }

    fn finish_turn(
        &self,
        session: DialogSession,
        reply: GeneratedReply,
        limit_reached: bool,
    ) -> TurnResult {
        let snapshot = SessionSnapshot::from(&session);
        self.store.save(session);

        self.emit(DialogEvent::Replied {
            call_id: snapshot.call_id.clone(),
            text: reply.text.clone(),
            source: reply.source,
        });

        TurnResult::Replied(TurnReply {
            mood: self.analyzers.reply_mood.analyze(&reply.text),
            text: reply.text,
            source: reply.source,
            snapshot,
            limit_reached,
        })
    }

    /// Final analytics, then the session is dropped; unknown ids yield empty analytics
    pub fn handle_call_ended(&self, call_id: &str) -> SessionAnalytics {
        let analytics = self
            .session_analytics(call_id)
            .unwrap_or_else(|| SessionAnalytics::empty(call_id));

        if self.store.delete(call_id).is_some() {
            self.emit(DialogEvent::SessionEnded {
                call_id: call_id.to_string(),
                turn_count: analytics.turn_count,
            });
        }
        // The call lock stays until the sweep so queued events remain serialized

        analytics
    }

    /// Dispatch an inbound scenario event
    pub async fn handle_event(&self, event: InboundEvent) -> ResponseEnvelope {
        match event.event.as_str() {
            "asr_text" => {
                if event.call_id.trim().is_empty() {
                    return ResponseEnvelope::error("Missing call_id");
                }
                let text = event.text.unwrap_or_default();
                if text.trim().is_empty() {
                    return ResponseEnvelope::error("Empty text");
                }
                let lock = self.call_lock(&event.call_id);
                let _guard = lock.lock().await;

                match self
                    .handle_utterance(&event.call_id, &text, event.custom_data.unwrap_or_default())
                    .await
                {
                    TurnResult::Replied(reply) => ResponseEnvelope::ok(ResponsePayload::Turn(TurnPayload {
                        text: reply.text,
                        snapshot: reply.snapshot,
                    })),
                    TurnResult::Rejected(error) => ResponseEnvelope::error(error),
                }
            }
            "call_ended" => {
                if event.call_id.trim().is_empty() {
                    return ResponseEnvelope::error("Missing call_id");
                }
                let lock = self.call_lock(&event.call_id);
                let _guard = lock.lock().await;

                tracing::info!(call_id = %event.call_id, "Call ended");
                ResponseEnvelope::ok(ResponsePayload::CallEnded(
                    self.handle_call_ended(&event.call_id),
                ))
            }
            other => {
                tracing::warn!(event = %other, call_id = %event.call_id, "Unknown event type");
                ResponseEnvelope::error(format!("Unknown event type: {}", other))
            }
        }
    }

    pub fn session_analytics(&self, call_id: &str) -> Option<SessionAnalytics> {
        let session = self.store.get(call_id)?;
        Some(SessionAnalytics {
            call_id: session.call_id().to_string(),
            duration_seconds: session.duration_seconds(Utc::now()),
            turn_count: session.turn_count(),
            stage: session.stage(),
            ladder_phase: session.ladder_phase(),
            objections_handled: session.objections_handled().to_vec(),
            contacts_found: session.contacts_found().to_vec(),
            engagement: session
                .last_tone()
                .map(|tone| self.analyzers.sentiment.label(tone).to_string()),
            history_length: session.history().len(),
            conversation_flow: session.conversation_flow().to_vec(),
        })
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store.list()
    }

    /// Drop expired sessions and idle call locks; returns how many sessions went
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = self.store.sweep(now);
        // A lock cloned by an in-flight event has more than one owner
        self.call_locks
            .lock()
            .retain(|call_id, lock| self.store.contains(call_id) || Arc::strong_count(lock) > 1);
        removed
    }

    fn call_lock(&self, call_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.call_locks
            .lock()
            .entry(call_id.to_string())
            .or_default()
            .clone()
    }

    fn emit(&self, event: DialogEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
