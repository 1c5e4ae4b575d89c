//! Conversation types including stages and turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::ContactEntities;
use crate::objection::ObjectionCategory;

/// Dialog stages of a cold call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogStage {
    /// Introduction and search for the right person
    #[default]
    Greeting,
    /// Working through callee pushback
    ObjectionHandling,
    /// Pitching the service and asking for a quote request
    ValuePresentation,
    /// Fixing the result: contact or quote destination
    Closing,
}

impl DialogStage {
    /// All stages in funnel order
    pub const ALL: [DialogStage; 4] = [
        DialogStage::Greeting,
        DialogStage::ObjectionHandling,
        DialogStage::ValuePresentation,
        DialogStage::Closing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialogStage::Greeting => "greeting",
            DialogStage::ObjectionHandling => "objection_handling",
            DialogStage::ValuePresentation => "value_presentation",
            DialogStage::Closing => "closing",
        }
    }

    /// Position in the funnel, used to reason about forward progress
    pub fn ordinal(&self) -> u8 {
        match self {
            DialogStage::Greeting => 0,
            DialogStage::ObjectionHandling => 1,
            DialogStage::ValuePresentation => 2,
            DialogStage::Closing => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogStage::Closing)
    }

    /// Parse from the snake_case name
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for DialogStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Callee speech
    User,
    /// Reply spoken by the agent
    Agent,
    /// Instructions or notes injected by the engine
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Agent => "agent",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-turn classifier findings, kept for the audit trail only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnAnnotation {
    pub objections: Vec<ObjectionCategory>,
    pub entities: ContactEntities,
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// When the turn occurred
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<TurnAnnotation>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            annotation: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Agent, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    /// Attach classifier findings
    pub fn with_annotation(mut self, annotation: TurnAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }
}
