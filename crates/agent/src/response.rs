//! Reply generation with a deterministic fallback
//!
//! The generation backend is tried first, bounded by the per-turn deadline.
//! Anything short of a usable reply (no backend, error, timeout, empty text
//! or a goodbye the termination policy does not allow) falls back to
//! scripted replies. The caller learns which path was taken from
//! [`ReplySource`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use cold_call_config::{LadderScripts, StageScripts, TerminationRules};
use cold_call_core::DialogStage;
use cold_call_llm::{GenerationParams, LlmBackend, LlmError};
use cold_call_text_processing::{ClassificationResult, PhraseSet, Result as PatternResult};

use crate::prompt::{DialogPromptBuilder, PromptExtras};
use crate::session::DialogSession;

/// Why a scripted reply replaced generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    BackendUnavailable,
    BackendError,
    Timeout,
    EmptyOutput,
    PrematureFarewell,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::BackendUnavailable => "backend_unavailable",
            FallbackReason::BackendError => "backend_error",
            FallbackReason::Timeout => "timeout",
            FallbackReason::EmptyOutput => "empty_output",
            FallbackReason::PrematureFarewell => "premature_farewell",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Generated,
    Fallback(FallbackReason),
    /// Closing line spoken once the session hit its turn or time limit
    LimitReached,
}

impl ReplySource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReplySource::Fallback(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub text: String,
    pub source: ReplySource,
}

/// Decides when the call may end and what is said then
///
/// Farewell and rejection phrases match on word boundaries only.
#[derive(Debug, Clone)]
pub struct TerminationPolicy {
    farewell: PhraseSet,
    rejection: PhraseSet,
    termination_reply: String,
    limit_reply: String,
}

impl TerminationPolicy {
    pub fn new(rules: &TerminationRules) -> PatternResult<Self> {
        Ok(Self {
            farewell: PhraseSet::whole_word("termination.farewell_phrases", &rules.farewell_phrases)?,
            rejection: PhraseSet::whole_word(
                "termination.rejection_keywords",
                &rules.rejection_keywords,
            )?,
            termination_reply: rules.termination_reply.clone(),
            limit_reply: rules.limit_reply.clone(),
        })
    }

    /// Reply reads as a goodbye
    pub fn is_farewell(&self, reply: &str) -> bool {
        self.farewell.matches(reply)
    }

    /// Callee explicitly turned the pitch down
    pub fn is_rejection(&self, utterance: &str) -> bool {
        self.rejection.matches(utterance)
    }

    /// A goodbye is only allowed once closing, or when the callee asked for it
    pub fn allows_farewell(&self, stage: DialogStage, utterance: &str) -> bool {
        stage == DialogStage::Closing || self.is_rejection(utterance)
    }

    pub fn termination_reply(&self) -> &str {
        &self.termination_reply
    }

    pub fn limit_reply(&self) -> &str {
        &self.limit_reply
    }
}

/// What the fallback table looks at
#[derive(Debug, Clone, Copy)]
pub struct FallbackInput<'a> {
    pub stage: DialogStage,
    /// 1-based number of the exchange being answered
    pub turn: u32,
    pub utterance: &'a str,
    pub classification: &'a ClassificationResult,
}

#[derive(Debug, Clone)]
struct KeywordRule {
    keywords: PhraseSet,
    replies: Vec<String>,
}

impl KeywordRule {
    fn reply_for_turn(&self, turn: u32) -> Option<&str> {
        let last = self.replies.len().checked_sub(1)?;
        let index = (turn.saturating_sub(1) as usize).min(last);
        self.replies.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct LadderTable {
    keyword_rules: Vec<KeywordRule>,
    short_answers: Vec<String>,
    short_until_turn: u32,
    short_reply: String,
    buckets: Vec<(u32, String)>,
}

impl From<&LadderScripts> for LadderTable {
    fn from(scripts: &LadderScripts) -> Self {
        Self {
            keyword_rules: scripts
                .keyword_replies
                .iter()
                .map(|rule| KeywordRule {
                    keywords: PhraseSet::substring(&rule.keywords),
                    replies: rule.replies.clone(),
                })
                .collect(),
            short_answers: scripts
                .short_answer
                .answers
                .iter()
                .map(|a| a.trim().to_lowercase())
                .collect(),
            short_until_turn: scripts.short_answer.until_turn,
            short_reply: scripts.short_answer.reply.clone(),
            buckets: scripts
                .turn_buckets
                .iter()
                .map(|b| (b.until_turn, b.reply.clone()))
                .collect(),
        }
    }
}

impl LadderTable {
    fn reply<'a>(&'a self, turn: u32, utterance: &str, termination: &'a str) -> &'a str {
        if let Some(reply) = self
            .keyword_rules
            .iter()
            .find(|rule| rule.keywords.matches(utterance))
            .and_then(|rule| rule.reply_for_turn(turn))
        {
            return reply;
        }

        let normalized = utterance
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if self.short_answers.iter().any(|a| *a == normalized) {
            return if turn <= self.short_until_turn {
                &self.short_reply
            } else {
                termination
            };
        }

        self.buckets
            .iter()
            .find(|(until, _)| turn <= *until)
            .map(|(_, reply)| reply.as_str())
            .unwrap_or(termination)
    }
}

#[derive(Debug, Clone)]
enum FallbackTable {
    Stages(StageScripts),
    Ladder(LadderTable),
}

/// Scripted replies of one profile
///
/// Order: objection rebuttal, then the termination reply on an explicit
/// rejection, then the profile's own table.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    table: FallbackTable,
}

impl FallbackPolicy {
    pub fn event_driven(scripts: &StageScripts) -> Self {
        Self {
            table: FallbackTable::Stages(scripts.clone()),
        }
    }

    pub fn turn_ladder(scripts: &LadderScripts) -> Self {
        Self {
            table: FallbackTable::Ladder(LadderTable::from(scripts)),
        }
    }

    pub fn reply(&self, input: &FallbackInput<'_>, termination: &TerminationPolicy) -> String {
        if let Some(rebuttal) = &input.classification.rebuttal {
            return rebuttal.clone();
        }

        if termination.is_rejection(input.utterance) {
            return termination.termination_reply().to_string();
        }

        match &self.table {
            FallbackTable::Stages(scripts) => scripts
                .for_stage(input.stage)
                .first()
                .cloned()
                .unwrap_or_else(|| termination.termination_reply().to_string()),
            FallbackTable::Ladder(table) => table
                .reply(input.turn, input.utterance, termination.termination_reply())
                .to_string(),
        }
    }
}

/// One reply request
#[derive(Debug, Clone, Copy)]
pub struct ReplyRequest<'a> {
    /// Session with the current utterance already applied
    pub session: &'a DialogSession,
    pub utterance: &'a str,
    pub classification: &'a ClassificationResult,
    pub extras: &'a PromptExtras,
}

/// Generation backend behind a deadline, with scripted fallback
pub struct ResponseGenerator {
    backend: Option<Arc<dyn LlmBackend>>,
    params: GenerationParams,
    timeout: Duration,
    prompts: DialogPromptBuilder,
    fallback: FallbackPolicy,
    termination: TerminationPolicy,
}

impl ResponseGenerator {
    pub fn new(
        backend: Option<Arc<dyn LlmBackend>>,
        params: GenerationParams,
        timeout: Duration,
        prompts: DialogPromptBuilder,
        fallback: FallbackPolicy,
        termination: TerminationPolicy,
    ) -> Self {
        Self {
            backend,
            params,
            timeout,
            prompts,
            fallback,
            termination,
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn termination(&self) -> &TerminationPolicy {
        &self.termination
    }

    /// Produce a reply; never fails
    pub async fn generate(&self, request: ReplyRequest<'_>) -> GeneratedReply {
        let session = request.session;

        let reason = match self.try_generate(&request).await {
            Ok(text) => {
                return GeneratedReply {
                    text,
                    source: ReplySource::Generated,
                }
            }
            Err(reason) => reason,
        };

        metrics::counter!("dialog_fallback_total", "reason" => reason.as_str()).increment(1);
        if reason == FallbackReason::BackendUnavailable {
            tracing::debug!(call_id = %session.call_id(), "No generation backend, using script");
        } else {
            tracing::warn!(
                call_id = %session.call_id(),
                stage = %session.stage(),
                reason = %reason,
                "Falling back to scripted reply"
            );
        }

        let text = self.fallback.reply(
            &FallbackInput {
                stage: session.stage(),
                turn: session.turn_count() + 1,
                utterance: request.utterance,
                classification: request.classification,
            },
            &self.termination,
        );

        GeneratedReply {
            text,
            source: ReplySource::Fallback(reason),
        }
    }

    async fn try_generate(&self, request: &ReplyRequest<'_>) -> Result<String, FallbackReason> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(FallbackReason::BackendUnavailable)?;
        let session = request.session;

        let messages = self
            .prompts
            .build(session, request.utterance, request.extras, Utc::now());

        let result = match tokio::time::timeout(self.timeout, backend.generate(&messages, &self.params)).await {
            Err(_) => return Err(FallbackReason::Timeout),
            Ok(Err(LlmError::Timeout)) => return Err(FallbackReason::Timeout),
            Ok(Err(e)) => {
                tracing::warn!(call_id = %session.call_id(), error = %e, "Generation backend failed");
                return Err(FallbackReason::BackendError);
            }
            Ok(Ok(result)) => result,
        };

        let text = result.text.trim();
        if text.is_empty() {
            return Err(FallbackReason::EmptyOutput);
        }

        if self.termination.is_farewell(text)
            && !self
                .termination
                .allows_farewell(session.stage(), request.utterance)
        {
            tracing::info!(
                call_id = %session.call_id(),
                stage = %session.stage(),
                "Discarding premature farewell"
            );
            return Err(FallbackReason::PrematureFarewell);
        }

        tracing::debug!(
            call_id = %session.call_id(),
            model = %backend.model_name(),
            tokens = result.tokens,
            elapsed_ms = result.total_time_ms,
            "Generated reply"
        );
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cold_call_core::ObjectionCategory;

    fn termination() -> TerminationPolicy {
        TerminationPolicy::new(&TerminationRules::default()).unwrap()
    }

    fn input<'a>(
        stage: DialogStage,
        turn: u32,
        utterance: &'a str,
        classification: &'a ClassificationResult,
    ) -> FallbackInput<'a> {
        FallbackInput {
            stage,
            turn,
            utterance,
            classification,
        }
    }

    #[test]
    fn test_farewell_needs_closing_or_rejection() {
        let policy = termination();

        assert!(policy.is_farewell("Хорошо, до свидания!"));
        assert!(!policy.is_farewell("Покажите, пожалуйста, маршрут"));

        assert!(!policy.allows_farewell(DialogStage::ValuePresentation, "расскажите"));
        assert!(policy.allows_farewell(DialogStage::Closing, "расскажите"));
        assert!(policy.allows_farewell(DialogStage::Greeting, "нам это не интересно"));
    }

    #[test]
    fn test_rebuttal_wins() {
        let policy = FallbackPolicy::event_driven(&StageScripts::default());
        let classification = ClassificationResult {
            category: Some(ObjectionCategory::Busy),
            all_matches: vec![ObjectionCategory::Busy],
            rebuttal: Some("Перезвоню позже".to_string()),
            confidence: 0.9,
        };

        let reply = policy.reply(
            &input(DialogStage::ObjectionHandling, 1, "занят, пока", &classification),
            &termination(),
        );
        assert_eq!(reply, "Перезвоню позже");
    }

    #[test]
    fn test_rejection_gives_termination_reply() {
        let none = ClassificationResult::none();
        let policy = termination();

        for fallback in [
            FallbackPolicy::event_driven(&StageScripts::default()),
            FallbackPolicy::turn_ladder(&LadderScripts::default()),
        ] {
            let reply = fallback.reply(&input(DialogStage::Greeting, 1, "не актуально", &none), &policy);
            assert_eq!(reply, policy.termination_reply());
        }
    }

    #[test]
    fn test_stage_table_uses_first_entry() {
        let none = ClassificationResult::none();
        let scripts = StageScripts::default();
        let policy = FallbackPolicy::event_driven(&scripts);

        for stage in DialogStage::ALL {
            let reply = policy.reply(&input(stage, 1, "угу", &none), &termination());
            assert_eq!(reply, scripts.for_stage(stage)[0]);
        }
    }

    #[test]
    fn test_ladder_keyword_replies_follow_turn() {
        let none = ClassificationResult::none();
        let scripts = LadderScripts::default();
        let policy = FallbackPolicy::turn_ladder(&scripts);
        let greeting = &scripts.keyword_replies[2];

        let first = policy.reply(&input(DialogStage::Greeting, 1, "Здравствуйте", &none), &termination());
        let second = policy.reply(&input(DialogStage::Greeting, 2, "Здравствуйте", &none), &termination());
        let late = policy.reply(&input(DialogStage::Closing, 8, "Здравствуйте", &none), &termination());

        assert_eq!(first, greeting.replies[0]);
        assert_eq!(second, greeting.replies[1]);
        assert_eq!(late, greeting.replies[2]);
    }

    #[test]
    fn test_ladder_short_answer_and_buckets() {
        let none = ClassificationResult::none();
        let scripts = LadderScripts::default();
        let policy = FallbackPolicy::turn_ladder(&scripts);
        let termination = termination();

        let early_no = policy.reply(&input(DialogStage::Greeting, 2, " Нет. ", &none), &termination);
        assert_eq!(early_no, scripts.short_answer.reply);

        let late_no = policy.reply(&input(DialogStage::Closing, 4, "нет", &none), &termination);
        assert_eq!(late_no, termination.termination_reply());

        let bucket_one = policy.reply(&input(DialogStage::Greeting, 1, "угу", &none), &termination);
        assert_eq!(bucket_one, scripts.turn_buckets[0].reply);

        let bucket_two = policy.reply(&input(DialogStage::ValuePresentation, 4, "угу", &none), &termination);
        assert_eq!(bucket_two, scripts.turn_buckets[1].reply);

        let past = policy.reply(&input(DialogStage::Closing, 5, "угу", &none), &termination);
        assert_eq!(past, termination.termination_reply());
    }

    #[test]
    fn test_reply_source_serialization() {
        let json = serde_json::to_value(ReplySource::Fallback(FallbackReason::Timeout)).unwrap();
        assert_eq!(json, serde_json::json!({"fallback": "timeout"}));
        assert_eq!(serde_json::to_value(ReplySource::Generated).unwrap(), "generated");
    }
}
