//! Generation request assembly
//!
//! Layout: persona system message, the most recent `history_window` turns,
//! the current utterance, then an objection hint when one was detected.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use cold_call_config::{DialogProfile, PromptTemplates};
use cold_call_core::{ObjectionCategory, Turn, TurnRole};
use cold_call_llm::Message;

use crate::session::DialogSession;

/// Per-turn inputs that are not part of the session
#[derive(Debug, Clone, Default)]
pub struct PromptExtras {
    pub objection: Option<ObjectionCategory>,
    /// Wording of the callee's tone
    pub tone_label: String,
    /// Caller-supplied hints (confidence, engagement, flow)
    pub custom_data: Map<String, Value>,
}

pub struct DialogPromptBuilder {
    templates: PromptTemplates,
    profile: DialogProfile,
    history_window: usize,
}

impl DialogPromptBuilder {
    pub fn new(templates: PromptTemplates, profile: DialogProfile, history_window: usize) -> Self {
        Self {
            templates,
            profile,
            history_window,
        }
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    pub fn build(
        &self,
        session: &DialogSession,
        utterance: &str,
        extras: &PromptExtras,
        now: DateTime<Utc>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history_window + 3);
        messages.push(Message::system(self.system_prompt(session, utterance, extras, now)));

        for turn in self.window(session.history(), utterance) {
            messages.push(Message::new(turn.role.into(), turn.content.clone()));
        }

        messages.push(Message::user(utterance));

        if let Some(category) = extras.objection {
            messages.push(Message::system(
                self.templates
                    .objection_hint
                    .replace("{objection}", category.as_str()),
            ));
        }

        messages
    }

    /// Last `history_window` turns before the current utterance
    fn window<'a>(&self, history: &'a [Turn], utterance: &str) -> &'a [Turn] {
        let prior = match history.last() {
            Some(last) if last.role == TurnRole::User && last.content == utterance => {
                &history[..history.len() - 1]
            }
            _ => history,
        };
        let start = prior.len().saturating_sub(self.history_window);
        &prior[start..]
    }

    fn system_prompt(
        &self,
        session: &DialogSession,
        utterance: &str,
        extras: &PromptExtras,
        now: DateTime<Utc>,
    ) -> String {
        let context = session.context();
        let template = match self.profile {
            DialogProfile::EventDriven => &self.templates.event_driven_system,
            DialogProfile::TurnLadder => &self.templates.turn_ladder_system,
        };

        let separator = &self.templates.list_separator;
        let objections = session
            .objections_handled()
            .iter()
            .map(|o| o.as_str())
            .collect::<Vec<_>>()
            .join(separator);
        let contacts = session.contacts_found().join(separator);

        let mut prompt = template
            .replace("{company}", &context.company)
            .replace("{service}", &context.service)
            .replace("{goal}", &context.goal)
            .replace("{persona}", &context.persona_name)
            .replace("{stage}", session.stage().as_str())
            .replace("{objections}", &objections)
            .replace("{contacts}", &contacts)
            .replace("{emotion}", &extras.tone_label);

        if prompt.contains("{context}") {
            let dialog_context = self.dialog_context(session, utterance, extras, now);
            prompt = prompt.replace("{context}", &dialog_context.to_string());
        }

        prompt
    }

    /// Structured context for the turn-ladder persona
    fn dialog_context(
        &self,
        session: &DialogSession,
        utterance: &str,
        extras: &PromptExtras,
        now: DateTime<Utc>,
    ) -> Value {
        let context = session.context();
        let custom = &extras.custom_data;

        let mut value = json!({
            "company": context.company,
            "service": context.service,
            "goal": context.goal,
            "turn_count": session.turn_count(),
            "session_duration": session.duration_seconds(now),
            "conversation_flow": custom.get("conversation_flow").cloned().unwrap_or_else(|| json!("greeting")),
            "user_engagement": custom.get("user_engagement").cloned().unwrap_or_else(|| json!(0)),
            "confidence": custom.get("confidence").cloned().unwrap_or_else(|| json!(0)),
        });

        if let Value::Object(map) = &mut value {
            for (key, val) in custom {
                map.insert(key.clone(), val.clone());
            }

            let mut recent: Vec<&str> = session
                .history()
                .iter()
                .filter(|t| t.role == TurnRole::User)
                .map(|t| t.content.as_str())
                .collect();
            if recent.last() != Some(&utterance) {
                recent.push(utterance);
            }
            let start = recent.len().saturating_sub(3);
            map.insert("recent_user_responses".to_string(), json!(recent[start..]));

            let stage = session
                .ladder_phase()
                .map(|p| p.as_str())
                .unwrap_or_else(|| session.stage().as_str());
            map.insert("stage".to_string(), json!(stage));
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionLimits, SessionStore};
    use cold_call_config::CallContext;
    use cold_call_llm::Role;

    fn session_with_history(turns: usize) -> DialogSession {
        let store = SessionStore::new(SessionLimits::default(), CallContext::default());
        let mut session = store.get_or_create("c1");
        for i in 0..turns {
            let turn = if i % 2 == 0 {
                Turn::user(format!("user {}", i))
            } else {
                Turn::agent(format!("agent {}", i))
            };
            session.history.push(turn);
        }
        session
    }

    #[test]
    fn test_window_is_bounded() {
        let builder =
            DialogPromptBuilder::new(PromptTemplates::default(), DialogProfile::EventDriven, 5);
        let session = session_with_history(12);

        let messages = builder.build(&session, "сейчас", &PromptExtras::default(), Utc::now());

        // system + 5 history + current
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "agent 7");
        assert_eq!(messages[5].content, "agent 11");
        assert_eq!(messages[5].role, Role::Assistant);
        assert_eq!(messages[6], Message::user("сейчас"));
    }

    #[test]
    fn test_current_utterance_not_duplicated() {
        let builder =
            DialogPromptBuilder::new(PromptTemplates::default(), DialogProfile::EventDriven, 5);
        let mut session = session_with_history(2);
        session.history.push(Turn::user("алло"));

        let messages = builder.build(&session, "алло", &PromptExtras::default(), Utc::now());
        let users: Vec<&Message> = messages.iter().filter(|m| m.content == "алло").collect();
        assert_eq!(users.len(), 1);
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_event_driven_system_prompt() {
        let builder =
            DialogPromptBuilder::new(PromptTemplates::default(), DialogProfile::EventDriven, 5);
        let mut session = session_with_history(0);
        session.stage = cold_call_core::DialogStage::ObjectionHandling;
        session.objections_handled = vec![ObjectionCategory::Busy, ObjectionCategory::SendEmail];
        session.contacts_found = vec!["a@b.ru".to_string(), "Иван".to_string()];

        let extras = PromptExtras {
            objection: Some(ObjectionCategory::SendEmail),
            ..PromptExtras::default()
        };
        let messages = builder.build(&session, "на почту", &extras, Utc::now());

        let system = &messages[0].content;
        assert!(system.contains("ТЕКУЩАЯ СТАДИЯ: objection_handling"));
        assert!(system.contains("ОБРАБОТАННЫЕ ВОЗРАЖЕНИЯ: busy, send_email"));
        assert!(system.contains("НАЙДЕННЫЕ КОНТАКТЫ: a@b.ru, Иван"));
        assert!(system.contains("TRANSTIREX"));

        let hint = messages.last().unwrap();
        assert_eq!(hint.role, Role::System);
        assert!(hint.content.contains("send_email"));
    }

    #[test]
    fn test_turn_ladder_context() {
        let builder =
            DialogPromptBuilder::new(PromptTemplates::default(), DialogProfile::TurnLadder, 10);
        let mut session = session_with_history(4);
        session.turn_count = 2;
        session.ladder_phase = Some(crate::stage::LadderPhase::NeedsAnalysis);

        let mut custom = Map::new();
        custom.insert("confidence".to_string(), json!(0.8));
        let extras = PromptExtras {
            objection: None,
            tone_label: "нейтральный".to_string(),
            custom_data: custom,
        };

        let messages = builder.build(&session, "а что везете", &extras, Utc::now());
        let system = &messages[0].content;

        assert!(system.starts_with("Ты - Алёна"));
        assert!(system.contains("Анализ эмоций клиента: нейтральный"));
        assert!(system.contains("\"stage\":\"needs_analysis\""));
        assert!(system.contains("\"confidence\":0.8"));
        assert!(system.contains("\"recent_user_responses\":[\"user 0\",\"user 2\",\"а что везете\"]"));
        assert!(!system.contains("{context}"));
    }
}
