//! Objection categories raised by callees

use serde::{Deserialize, Serialize};

/// Recognized pushback categories
///
/// Declaration order is the tie-break priority when several categories
/// match one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionCategory {
    /// "not interested", "we don't need it"
    NotInterested,
    /// Already works with a carrier or provider
    HasCarrier,
    /// Redirects to a generic mailbox
    SendEmail,
    /// No time right now
    Busy,
    /// Price concern
    Expensive,
    /// Gatekeeper, not the decision-maker
    Secretary,
}

impl ObjectionCategory {
    /// All categories in priority order
    pub const ALL: [ObjectionCategory; 6] = [
        ObjectionCategory::NotInterested,
        ObjectionCategory::HasCarrier,
        ObjectionCategory::SendEmail,
        ObjectionCategory::Busy,
        ObjectionCategory::Expensive,
        ObjectionCategory::Secretary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectionCategory::NotInterested => "not_interested",
            ObjectionCategory::HasCarrier => "has_carrier",
            ObjectionCategory::SendEmail => "send_email",
            ObjectionCategory::Busy => "busy",
            ObjectionCategory::Expensive => "expensive",
            ObjectionCategory::Secretary => "secretary",
        }
    }
}

impl std::fmt::Display for ObjectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
