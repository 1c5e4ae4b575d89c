//! Cold-call server
//!
//! HTTP surface for the telephony scenario, plus the telephony and speech
//! synthesis clients the dialog engine talks to.

pub mod http;
pub mod metrics;
pub mod records;
pub mod speech;
pub mod state;
pub mod sweep;
pub mod telephony;

pub use http::create_router;
pub use metrics::init_metrics;
pub use records::record_from_analytics;
pub use speech::HttpTextToSpeech;
pub use state::AppState;
pub use sweep::start_sweep_task;
pub use telephony::HttpTelephony;

use cold_call_core::CollaboratorError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<cold_call_persistence::PersistenceError> for ServerError {
    fn from(err: cold_call_persistence::PersistenceError) -> Self {
        ServerError::Persistence(err.to_string())
    }
}

impl From<cold_call_agent::AgentError> for ServerError {
    fn from(err: cold_call_agent::AgentError) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Collaborator(CollaboratorError::NotConfigured(_)) => {
                axum::http::StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Collaborator(CollaboratorError::Timeout) => {
                axum::http::StatusCode::GATEWAY_TIMEOUT
            }
            ServerError::Collaborator(_) => axum::http::StatusCode::BAD_GATEWAY,
            ServerError::Persistence(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StatusCode::from(ServerError::InvalidRequest("phone".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StatusCode::from(ServerError::Collaborator(CollaboratorError::NotConfigured(
                "telephony".into()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            StatusCode::from(ServerError::Collaborator(CollaboratorError::Rejected("x".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            StatusCode::from(ServerError::Collaborator(CollaboratorError::Timeout)),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
