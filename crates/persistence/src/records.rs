//! Finished-call records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PersistenceError;

/// What the call achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    #[default]
    Pending,
    /// Email or phone of someone to send the offer to
    ContactObtained,
    /// Callee asked for a quote
    QuoteRequested,
    Declined,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ContactObtained => "contact_obtained",
            Self::QuoteRequested => "quote_requested",
            Self::Declined => "declined",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "contact_obtained" => Self::ContactObtained,
            "quote_requested" => Self::QuoteRequested,
            "declined" => Self::Declined,
            _ => Self::Pending,
        }
    }
}

/// One row per finished call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Assigned by the store
    #[serde(default)]
    pub id: Option<i64>,
    pub phone_number: String,
    pub call_timestamp: DateTime<Utc>,
    pub duration_seconds: i64,
    pub status: String,

    pub secretary_name: Option<String>,
    pub secretary_mood: Option<String>,

    pub company_name: Option<String>,
    pub company_industry: Option<String>,

    pub decision_maker_name: Option<String>,
    pub decision_maker_position: Option<String>,
    pub decision_maker_email: Option<String>,
    pub decision_maker_phone: Option<String>,

    pub current_carrier: Option<String>,
    pub cargo_volume: Option<String>,
    pub directions: Vec<String>,
    pub pain_points: Vec<String>,

    pub outcome: CallOutcome,
    pub next_action: Option<String>,
    pub follow_up_date: Option<String>,

    pub objections: Vec<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl CallRecord {
    pub fn new(phone_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            phone_number: phone_number.into(),
            call_timestamp: now,
            duration_seconds: 0,
            status: "completed".to_string(),
            secretary_name: None,
            secretary_mood: None,
            company_name: None,
            company_industry: None,
            decision_maker_name: None,
            decision_maker_position: None,
            decision_maker_email: None,
            decision_maker_phone: None,
            current_carrier: None,
            cargo_volume: None,
            directions: Vec::new(),
            pain_points: Vec::new(),
            outcome: CallOutcome::Pending,
            next_action: None,
            follow_up_date: None,
            objections: Vec::new(),
            notes: None,
            created_at: now,
        }
    }
}

/// Append-only call record store
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Insert a record, returns its id
    async fn save_call(&self, record: &CallRecord) -> Result<i64, PersistenceError>;

    /// Newest first
    async fn list_calls(&self, limit: usize) -> Result<Vec<CallRecord>, PersistenceError>;

    async fn get_call(&self, id: i64) -> Result<Option<CallRecord>, PersistenceError>;
}
