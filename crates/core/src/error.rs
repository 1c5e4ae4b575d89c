//! Errors reported by external collaborators

use thiserror::Error;

/// Failure of a telephony, speech or synthesis collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Collaborator not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;
