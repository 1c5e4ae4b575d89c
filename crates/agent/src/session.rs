//! Dialog sessions and their store
//!
//! One `DialogSession` per active call, owned by the `SessionStore`. The
//! orchestrator works on a copy and writes it back when the turn is final;
//! a session deleted meanwhile (call ended) is not resurrected.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use cold_call_config::{CallContext, DialogConfig};
use cold_call_core::{ContactEntities, DialogStage, ObjectionCategory, Turn};
use cold_call_text_processing::Tone;

use crate::response::ReplySource;
use crate::stage::LadderPhase;

/// Turn and age limits of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_turns: u32,
    pub max_session_seconds: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from(&DialogConfig::default())
    }
}

impl From<&DialogConfig> for SessionLimits {
    fn from(config: &DialogConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            max_session_seconds: config.max_session_seconds,
        }
    }
}

/// One completed exchange, for analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntry {
    pub turn: u32,
    pub stage: DialogStage,
    pub user_input: String,
    pub ai_response: String,
    pub objections: Vec<ObjectionCategory>,
    pub contacts: ContactEntities,
    pub source: ReplySource,
}

/// State of one call
///
/// Counters and stage are only advanced by the orchestrator.
#[derive(Debug, Clone)]
pub struct DialogSession {
    pub(crate) call_id: String,
    pub(crate) history: Vec<Turn>,
    pub(crate) turn_count: u32,
    pub(crate) stage: DialogStage,
    pub(crate) ladder_phase: Option<LadderPhase>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity: DateTime<Utc>,
    pub(crate) objections_handled: Vec<ObjectionCategory>,
    pub(crate) contacts_found: Vec<String>,
    pub(crate) context: CallContext,
    pub(crate) last_tone: Option<Tone>,
    pub(crate) conversation_flow: Vec<FlowEntry>,
}

impl DialogSession {
    fn new(call_id: &str, context: CallContext, now: DateTime<Utc>) -> Self {
        Self {
            call_id: call_id.to_string(),
            history: Vec::new(),
            turn_count: 0,
            stage: DialogStage::default(),
            ladder_phase: None,
            created_at: now,
            last_activity: now,
            objections_handled: Vec::new(),
            contacts_found: Vec::new(),
            context,
            last_tone: None,
            conversation_flow: Vec::new(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn stage(&self) -> DialogStage {
        self.stage
    }

    pub fn ladder_phase(&self) -> Option<LadderPhase> {
        self.ladder_phase
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn objections_handled(&self) -> &[ObjectionCategory] {
        &self.objections_handled
    }

    pub fn contacts_found(&self) -> &[String] {
        &self.contacts_found
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn last_tone(&self) -> Option<Tone> {
        self.last_tone
    }

    pub fn conversation_flow(&self) -> &[FlowEntry] {
        &self.conversation_flow
    }

    /// Seconds since creation
    pub fn duration_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Add contacts not seen before, keeping first-seen order
    pub(crate) fn record_contacts(&mut self, entities: &ContactEntities) -> usize {
        let mut added = 0;
        for value in entities.all_values() {
            if !self.contacts_found.iter().any(|c| c == value) {
                self.contacts_found.push(value.clone());
                added += 1;
            }
        }
        added
    }
}

/// Row of the session listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub call_id: String,
    pub turn_count: u32,
    pub stage: DialogStage,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub history_length: usize,
}

impl From<&DialogSession> for SessionSummary {
    fn from(session: &DialogSession) -> Self {
        Self {
            call_id: session.call_id.clone(),
            turn_count: session.turn_count,
            stage: session.stage,
            created_at: session.created_at,
            last_activity: session.last_activity,
            history_length: session.history.len(),
        }
    }
}

/// In-memory session store keyed by call id
///
/// Safe for concurrent use across call ids. Callers serialize events for the
/// same call id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, DialogSession>>,
    limits: SessionLimits,
    context: CallContext,
}

impl SessionStore {
    pub fn new(limits: SessionLimits, context: CallContext) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
            context,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Existing session or a fresh one with the static call context
    pub fn get_or_create(&self, call_id: &str) -> DialogSession {
        if let Some(session) = self.sessions.read().get(call_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write();
        let session = sessions.entry(call_id.to_string()).or_insert_with(|| {
            tracing::info!(call_id = %call_id, "Created dialog session");
            metrics::counter!("dialog_sessions_created_total").increment(1);
            DialogSession::new(call_id, self.context.clone(), Utc::now())
        });
        session.clone()
    }

    pub fn get(&self, call_id: &str) -> Option<DialogSession> {
        self.sessions.read().get(call_id).cloned()
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.sessions.read().contains_key(call_id)
    }

    /// Mark activity on a live session
    pub fn touch(&self, call_id: &str) {
        if let Some(session) = self.sessions.write().get_mut(call_id) {
            session.last_activity = Utc::now();
        }
    }

    /// Turn limit reached or session older than the age limit
    pub fn is_expired(&self, session: &DialogSession, now: DateTime<Utc>) -> bool {
        session.turn_count >= self.limits.max_turns
            || (now - session.created_at).num_seconds() > self.limits.max_session_seconds as i64
    }

    /// Write back a session; returns false if it was deleted meanwhile
    pub fn save(&self, session: DialogSession) -> bool {
        match self.sessions.write().get_mut(&session.call_id) {
            Some(slot) => {
                *slot = session;
                true
            }
            None => {
                tracing::debug!(call_id = %session.call_id, "Session gone before save");
                false
            }
        }
    }

    /// Idempotent removal
    pub fn delete(&self, call_id: &str) -> Option<DialogSession> {
        let removed = self.sessions.write().remove(call_id);
        if removed.is_some() {
            tracing::info!(call_id = %call_id, "Deleted dialog session");
        }
        removed
    }

    /// Remove sessions that are idle past the age limit or expired by turns or age
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let max_age = self.limits.max_session_seconds as i64;
        let mut sessions = self.sessions.write();

        let expired: Vec<String> = sessions
            .values()
            .filter(|s| (now - s.last_activity).num_seconds() > max_age || self.is_expired(s, now))
            .map(|s| s.call_id.clone())
            .collect();

        for call_id in &expired {
            sessions.remove(call_id);
            tracing::info!(call_id = %call_id, "Expired dialog session");
        }

        if !expired.is_empty() {
            metrics::counter!("dialog_sessions_expired_total").increment(expired.len() as u64);
        }
        expired.len()
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .values()
            .map(SessionSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store(max_turns: u32, max_session_seconds: u64) -> SessionStore {
        SessionStore::new(
            SessionLimits {
                max_turns,
                max_session_seconds,
            },
            CallContext::default(),
        )
    }

    #[test]
    fn test_get_or_create_is_keyed() {
        let store = store(50, 3600);
        let first = store.get_or_create("c1");
        assert_eq!(first.turn_count(), 0);
        assert_eq!(first.stage(), DialogStage::Greeting);
        assert_eq!(first.context().company, "TRANSTIREX");

        let mut modified = first.clone();
        modified.turn_count = 2;
        assert!(store.save(modified));

        assert_eq!(store.get_or_create("c1").turn_count(), 2);
        assert_eq!(store.get_or_create("c2").turn_count(), 0);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_save_does_not_resurrect() {
        let store = store(50, 3600);
        let session = store.get_or_create("c1");
        store.delete("c1");

        assert!(!store.save(session));
        assert!(store.get("c1").is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = store(50, 3600);
        store.get_or_create("c1");

        assert!(store.delete("c1").is_some());
        assert!(store.delete("c1").is_none());
        assert!(store.delete("never-existed").is_none());
    }

    #[test]
    fn test_is_expired_by_turns_and_age() {
        let store = store(3, 60);
        let mut session = store.get_or_create("c1");
        let now = Utc::now();
        assert!(!store.is_expired(&session, now));

        session.turn_count = 3;
        assert!(store.is_expired(&session, now));

        session.turn_count = 0;
        session.created_at = now - Duration::seconds(61);
        assert!(store.is_expired(&session, now));
    }

    #[test]
    fn test_sweep_removes_idle_sessions() {
        let store = store(50, 60);
        let mut idle = store.get_or_create("idle");
        idle.last_activity = Utc::now() - Duration::seconds(120);
        idle.created_at = idle.last_activity;
        store.save(idle);
        store.get_or_create("fresh");

        assert_eq!(store.sweep(Utc::now()), 1);
        assert!(store.get("idle").is_none());
        assert!(store.get("fresh").is_some());
        assert_eq!(store.sweep(Utc::now()), 0);
    }

    #[test]
    fn test_sweep_removes_sessions_at_turn_limit() {
        let store = store(2, 3600);
        let mut done = store.get_or_create("done");
        done.turn_count = 2;
        store.save(done);
        let mut talking = store.get_or_create("talking");
        talking.turn_count = 1;
        store.save(talking);

        assert_eq!(store.sweep(Utc::now()), 1);
        assert!(store.get("done").is_none());
        assert!(store.get("talking").is_some());
    }

    #[test]
    fn test_touch_updates_last_activity() {
        let store = store(50, 60);
        let mut session = store.get_or_create("c1");
        let stale = Utc::now() - Duration::seconds(30);
        session.last_activity = stale;
        store.save(session);

        store.touch("c1");
        assert!(store.get("c1").unwrap().last_activity() > stale);
        store.touch("missing");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_record_contacts_deduplicates() {
        let store = store(50, 60);
        let mut session = store.get_or_create("c1");
        let entities = ContactEntities {
            emails: vec!["a@b.ru".to_string()],
            names: vec!["Иван".to_string()],
            ..ContactEntities::default()
        };

        assert_eq!(session.record_contacts(&entities), 2);
        assert_eq!(session.record_contacts(&entities), 0);
        assert_eq!(session.contacts_found(), ["a@b.ru", "Иван"]);
    }

    #[test]
    fn test_list_sessions() {
        let store = store(50, 60);
        store.get_or_create("a");
        store.get_or_create("b");

        let listed: Vec<String> = store.list().into_iter().map(|s| s.call_id).collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&"a".to_string()));
    }
}
