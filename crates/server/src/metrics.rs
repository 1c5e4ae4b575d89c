//! Prometheus metrics

use axum::{extract::State, http::StatusCode};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global recorder; `None` if one is already installed
pub fn init_metrics() -> Option<PrometheusHandle> {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            return None;
        }
    };

    metrics::describe_counter!("dialog_turns_total", "Dialog turns answered");
    metrics::describe_counter!(
        "dialog_fallback_total",
        "Replies taken from scripts instead of the generation backend"
    );
    metrics::describe_counter!("dialog_sessions_created_total", "Dialog sessions created");
    metrics::describe_counter!("dialog_sessions_expired_total", "Dialog sessions swept as expired");
    metrics::describe_histogram!(
        "llm_request_duration_seconds",
        metrics::Unit::Seconds,
        "Generation backend latency"
    );
    metrics::describe_counter!("call_records_saved_total", "Finished calls written to the store");

    Some(handle)
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or(StatusCode::NOT_FOUND)
}
