//! HTTP Endpoints
//!
//! Webhook for the telephony scenario plus the operator API.

use std::time::Duration;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use cold_call_agent::{InboundEvent, ResponseEnvelope, ResponsePayload, SessionAnalytics};
use cold_call_core::{CollaboratorError, EmotionHint};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::metrics::metrics_handler;
use crate::records::record_from_analytics;
use crate::state::AppState;
use crate::ServerError;

const START_RECOGNITION: &str = "start_recognition_session";
const PROCESS_AUDIO: &str = "process_audio_chunk";
const END_RECOGNITION: &str = "end_recognition_session";

const DEFAULT_TEST_TEXT: &str = "Привет, как дела?";
const DEFAULT_CALLS_LIMIT: usize = 50;
const MAX_CALLS_LIMIT: usize = 500;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds);

    Router::new()
        // Telephony scenario webhook
        .route("/api/voxi/events", post(handle_events))
        .route("/api/test/dialog", post(test_dialog))
        // Sessions
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:call_id", get(get_session).delete(delete_session))
        .route("/api/cleanup", post(cleanup_sessions))
        // Collaborators
        .route("/api/call", post(place_call))
        .route("/api/tts", post(synthesize))
        // Call records
        .route("/api/calls", get(list_calls))
        .route("/api/calls/:id", get(get_call))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Permissive when CORS is disabled, localhost when no origin parses
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        return layer.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

fn failure(err: ServerError) -> StatusCode {
    tracing::warn!(error = %err, "Request failed");
    err.into()
}

/// Health check
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "active_sessions": state.orchestrator.active_sessions(),
        "profile": state.orchestrator.profile().as_str(),
        "timestamp": Utc::now(),
    }))
}

/// Scenario events: dialog events go to the engine, recognition events to STT
async fn handle_events(
    State(state): State<AppState>,
    Json(mut body): Json<Value>,
) -> Result<Response, StatusCode> {
    let Value::Object(fields) = &mut body else {
        return Err(failure(ServerError::InvalidRequest(
            "Event must be a JSON object".to_string(),
        )));
    };
    // A missing, null or non-string name reads as an unknown event
    let event = fields
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    fields.insert("event".to_string(), Value::String(event.clone()));

    if matches!(event.as_str(), START_RECOGNITION | PROCESS_AUDIO | END_RECOGNITION) {
        return Ok(Json(handle_recognition_event(&state, &event, &body).await).into_response());
    }

    let inbound: InboundEvent = match serde_json::from_value(body) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!(event = %event, error = %e, "Malformed inbound event");
            return Ok(Json(ResponseEnvelope::error(format!("Invalid event: {}", e))).into_response());
        }
    };
    let phone_number = inbound
        .custom_data
        .as_ref()
        .and_then(|data| data.get("phone_number"))
        .and_then(Value::as_str)
        .map(str::to_string);

    tracing::debug!(event = %inbound.event, call_id = %inbound.call_id, "Inbound event");
    let envelope = state.orchestrator.handle_event(inbound).await;

    if let Some(ResponsePayload::CallEnded(analytics)) = &envelope.response {
        store_call_record(&state, analytics, phone_number.as_deref()).await;
    }

    Ok(Json(envelope).into_response())
}

async fn store_call_record(state: &AppState, analytics: &SessionAnalytics, phone_number: Option<&str>) {
    let Some(calls) = &state.calls else {
        return;
    };
    if analytics.turn_count == 0 {
        tracing::debug!(call_id = %analytics.call_id, "No turns, call record skipped");
        return;
    }

    let record = record_from_analytics(analytics, phone_number);
    match calls.save_call(&record).await {
        Ok(id) => {
            metrics::counter!("call_records_saved_total").increment(1);
            tracing::info!(
                call_id = %analytics.call_id,
                record_id = id,
                outcome = %record.outcome.as_str(),
                "Stored call record"
            );
        }
        Err(e) => {
            tracing::error!(call_id = %analytics.call_id, error = %e, "Failed to store call record");
        }
    }
}

fn recognition_error(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}

async fn handle_recognition_event(state: &AppState, event: &str, body: &Value) -> Value {
    let Some(stt) = &state.stt else {
        return recognition_error("Speech recognition not configured");
    };
    let call_id = body.get("call_id").and_then(Value::as_str).unwrap_or_default();
    let session_id = body.get("session_id").and_then(Value::as_str);

    match event {
        START_RECOGNITION => match stt.start_session(call_id).await {
            Ok(session_id) => {
                tracing::info!(call_id = %call_id, session_id = %session_id, "Recognition session started");
                json!({ "success": true, "session_id": session_id })
            }
            Err(e) => recognition_error(e.to_string()),
        },
        PROCESS_AUDIO => {
            let audio = body.get("audio_data").and_then(Value::as_str);
            let (Some(session_id), Some(audio)) = (session_id, audio) else {
                return recognition_error("Missing session_id or audio_data");
            };
            let bytes = match BASE64.decode(audio) {
                Ok(bytes) => bytes,
                Err(e) => return recognition_error(format!("Invalid audio_data: {}", e)),
            };

            match stt.feed_audio(session_id, &bytes).await {
                Ok(Some(transcript))
                    if transcript.is_final
                        && !call_id.is_empty()
                        && !transcript.text.trim().is_empty() =>
                {
                    let reply = state
                        .orchestrator
                        .handle_event(InboundEvent::asr_text(call_id, transcript.text.clone()))
                        .await;
                    json!({ "success": true, "result": transcript, "reply": reply })
                }
                Ok(transcript) => json!({ "success": true, "result": transcript }),
                Err(e) => recognition_error(e.to_string()),
            }
        }
        _ => {
            let Some(session_id) = session_id else {
                return recognition_error("Missing session_id");
            };
            match stt.end_session(session_id).await {
                Ok(()) => json!({ "success": true }),
                Err(e) => recognition_error(e.to_string()),
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TestDialogRequest {
    text: Option<String>,
    call_id: Option<String>,
}

/// Run a synthetic `asr_text` event through the engine
async fn test_dialog(
    State(state): State<AppState>,
    Json(request): Json<TestDialogRequest>,
) -> Json<Value> {
    let text = request.text.unwrap_or_else(|| DEFAULT_TEST_TEXT.to_string());
    let call_id = request
        .call_id
        .unwrap_or_else(|| format!("test_{}", Uuid::new_v4().simple()));

    let mut custom_data = Map::new();
    custom_data.insert("test".to_string(), Value::Bool(true));
    custom_data.insert("timestamp".to_string(), json!(Utc::now()));

    let result = state
        .orchestrator
        .handle_event(InboundEvent {
            event: "asr_text".to_string(),
            call_id,
            text: Some(text.clone()),
            custom_data: Some(custom_data),
        })
        .await;

    Json(json!({ "test": true, "input": text, "result": result }))
}

/// List sessions
async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.orchestrator.list_sessions();
    Json(json!({
        "active_sessions": sessions.len(),
        "sessions": sessions,
    }))
}

/// Session analytics
async fn get_session(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<SessionAnalytics>, StatusCode> {
    state
        .orchestrator
        .session_analytics(&call_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Drop a session without waiting for `call_ended`
async fn delete_session(State(state): State<AppState>, Path(call_id): Path<String>) -> Json<Value> {
    state.orchestrator.handle_call_ended(&call_id);
    Json(json!({
        "success": true,
        "message": format!("Session {} cleaned up", call_id),
    }))
}

/// Sweep expired sessions now
async fn cleanup_sessions(State(state): State<AppState>) -> Json<Value> {
    let removed = state.orchestrator.sweep(Utc::now());
    Json(json!({
        "success": true,
        "removed": removed,
        "active_sessions": state.orchestrator.active_sessions(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CallRequest {
    phone_number: Option<String>,
}

/// Place an outbound call
async fn place_call(
    State(state): State<AppState>,
    Json(request): Json<CallRequest>,
) -> Result<Json<Value>, StatusCode> {
    let phone_number = request
        .phone_number
        .filter(|phone| !phone.trim().is_empty())
        .ok_or_else(|| failure(ServerError::InvalidRequest("Phone number is required".to_string())))?;

    let telephony = state.telephony.as_ref().ok_or_else(|| {
        failure(ServerError::Collaborator(CollaboratorError::NotConfigured(
            "telephony".to_string(),
        )))
    })?;

    tracing::info!(phone = %phone_number, "Placing call");
    let placement = telephony
        .place_call(phone_number.trim())
        .await
        .map_err(|e| failure(e.into()))?;

    Ok(Json(json!({
        "success": true,
        "call_id": placement.call_id,
        "phone_number": phone_number,
    })))
}

#[derive(Debug, Deserialize)]
struct TtsRequest {
    text: String,
    #[serde(default)]
    voice: Option<String>,
    /// Derived from the text when absent
    #[serde(default)]
    emotion: Option<EmotionHint>,
}

/// Synthesize a reply, returns the audio bytes
async fn synthesize(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, StatusCode> {
    if request.text.trim().is_empty() {
        return Err(failure(ServerError::InvalidRequest("Text is required".to_string())));
    }
    let tts = state.tts.as_ref().ok_or_else(|| {
        failure(ServerError::Collaborator(CollaboratorError::NotConfigured(
            "speech".to_string(),
        )))
    })?;

    let emotion = request
        .emotion
        .unwrap_or_else(|| state.orchestrator.analyzers().reply_mood.analyze(&request.text).mood);
    let voice = request
        .voice
        .unwrap_or_else(|| state.config.speech.default_voice.clone());

    let audio = tts
        .synthesize(&request.text, &voice, emotion)
        .await
        .ok_or(StatusCode::BAD_GATEWAY)?;

    let content_type = if state.config.speech.format == "oggopus" {
        "audio/ogg"
    } else {
        "application/octet-stream"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], audio).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CallsQuery {
    limit: Option<usize>,
}

/// Stored call records, newest first
async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Value>, StatusCode> {
    let calls = state.calls.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    let limit = query.limit.unwrap_or(DEFAULT_CALLS_LIMIT).min(MAX_CALLS_LIMIT);

    let records = calls
        .list_calls(limit)
        .await
        .map_err(|e| failure(e.into()))?;

    Ok(Json(json!({
        "count": records.len(),
        "calls": records,
    })))
}

async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let calls = state.calls.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    let record = calls
        .get_call(id)
        .await
        .map_err(|e| failure(e.into()))?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(json!(record)))
}
