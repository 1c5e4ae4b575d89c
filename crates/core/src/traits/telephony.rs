//! Telephony call placement

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A call accepted by the telephony platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPlacement {
    /// Identifier the platform will use in subsequent events
    pub call_id: String,
}

/// Outbound call placement
///
/// A placement failure is terminal for the call-initiation request; no dialog
/// session exists until the platform starts sending events for the call.
#[async_trait]
pub trait Telephony: Send + Sync {
    async fn place_call(&self, phone_number: &str) -> Result<CallPlacement>;
}
