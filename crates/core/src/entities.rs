//! Contact entities extracted from callee speech

use serde::{Deserialize, Serialize};

/// Contacts found in one utterance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntities {
    pub emails: Vec<String>,
    /// Digits only, prefix included (`+7` or `8`)
    pub phones: Vec<String>,
    pub names: Vec<String>,
    /// The utterance mentions someone with authority over logistics
    pub has_decision_maker: bool,
}

impl ContactEntities {
    /// No contact strings were found (the decision-maker flag is not a contact)
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.names.is_empty()
    }

    /// Email or phone present; a name alone is not a reachable contact
    pub fn has_reachable_contact(&self) -> bool {
        !self.emails.is_empty() || !self.phones.is_empty()
    }

    /// Emails, then phones, then names
    pub fn all_values(&self) -> impl Iterator<Item = &String> {
        self.emails.iter().chain(self.phones.iter()).chain(self.names.iter())
    }
}
