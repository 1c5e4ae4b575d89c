//! Router tests against the scripted engine and in-process collaborator doubles

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use cold_call_agent::{DialogOrchestrator, OrchestratorConfig};
use cold_call_config::Settings;
use cold_call_core::{
    CallPlacement, CollaboratorError, EmotionHint, SpeechToText, Telephony, TextToSpeech,
    Transcript,
};
use cold_call_persistence::SqliteCallStore;
use cold_call_server::{create_router, AppState};

struct FakeTelephony {
    dialed: Mutex<Vec<String>>,
}

#[async_trait]
impl Telephony for FakeTelephony {
    async fn place_call(&self, phone_number: &str) -> cold_call_core::Result<CallPlacement> {
        self.dialed.lock().push(phone_number.to_string());
        Ok(CallPlacement {
            call_id: "call_42".to_string(),
        })
    }
}

struct RejectingTelephony;

#[async_trait]
impl Telephony for RejectingTelephony {
    async fn place_call(&self, _phone_number: &str) -> cold_call_core::Result<CallPlacement> {
        Err(CollaboratorError::Rejected("Invalid rule".to_string()))
    }
}

struct FakeTts {
    emotions: Mutex<Vec<EmotionHint>>,
}

#[async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(&self, text: &str, voice: &str, emotion: EmotionHint) -> Option<Vec<u8>> {
        self.emotions.lock().push(emotion);
        Some(format!("{}:{}", voice, text).into_bytes())
    }
}

/// Treats the audio bytes as UTF-8 text, every chunk final
struct EchoStt;

#[async_trait]
impl SpeechToText for EchoStt {
    async fn start_session(&self, call_id: &str) -> cold_call_core::Result<String> {
        Ok(format!("stt_{}", call_id))
    }

    async fn feed_audio(
        &self,
        _session_id: &str,
        audio: &[u8],
    ) -> cold_call_core::Result<Option<Transcript>> {
        Ok(Some(Transcript {
            text: String::from_utf8_lossy(audio).to_string(),
            is_final: true,
        }))
    }

    async fn end_session(&self, _session_id: &str) -> cold_call_core::Result<()> {
        Ok(())
    }
}

fn bare_state() -> AppState {
    let orchestrator = DialogOrchestrator::new(OrchestratorConfig::default(), None).unwrap();
    AppState::new(Settings::default(), Arc::new(orchestrator))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = create_router(bare_state());
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_sessions"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_asr_text_event_creates_session() {
    let app = create_router(bare_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "asr_text", "call_id": "c1", "text": "Алло, слушаю"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(!body["response"]["text"].as_str().unwrap().is_empty());
    assert_eq!(body["response"]["call_id"], "c1");
    assert_eq!(body["response"]["turn_count"], 1);

    let (_, sessions) = send(&app, Method::GET, "/api/sessions", None).await;
    assert_eq!(sessions["active_sessions"], 1);
    assert_eq!(sessions["sessions"][0]["call_id"], "c1");

    let (status, analytics) = send(&app, Method::GET, "/api/sessions/c1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["turn_count"], 1);

    let (status, _) = send(&app, Method::GET, "/api/sessions/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_errors_are_envelopes() {
    let app = create_router(bare_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "ringing", "call_id": "c1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unknown event type: ringing");

    let (_, body) = send(&app, Method::POST, "/api/voxi/events", Some(json!({"call_id": "c1"}))).await;
    assert_eq!(body["error"], "Unknown event type: unknown");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": null, "call_id": "c1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "Unknown event type: unknown");

    for malformed in [
        json!({"event": "asr_text", "call_id": 42, "text": "алло"}),
        json!({"event": "asr_text", "call_id": "c1", "text": 5}),
    ] {
        let (status, body) = send(&app, Method::POST, "/api/voxi/events", Some(malformed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid event"));
    }

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "asr_text", "call_id": "c1", "text": "  "})),
    )
    .await;
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::POST, "/api/voxi/events", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_call_ended_stores_record() {
    let store = SqliteCallStore::open(":memory:").unwrap();
    let app = create_router(bare_state().with_call_store(Arc::new(store)));

    send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({
            "event": "asr_text",
            "call_id": "c7",
            "text": "Пишите на ivan@cargo.ru",
            "custom_data": {"phone_number": "+79001234567"}
        })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({
            "event": "call_ended",
            "call_id": "c7",
            "custom_data": {"phone_number": "+79001234567"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"]["turn_count"], 1);
    assert_eq!(body["response"]["contacts_found"][0], "ivan@cargo.ru");

    let (_, calls) = send(&app, Method::GET, "/api/calls", None).await;
    assert_eq!(calls["count"], 1);
    let record = &calls["calls"][0];
    assert_eq!(record["phone_number"], "+79001234567");
    assert_eq!(record["decision_maker_email"], "ivan@cargo.ru");
    assert!(record["decision_maker_phone"].is_null());
    assert_eq!(record["decision_maker_email"], "ivan@cargo.ru");
    assert_eq!(record["outcome"], "contact_obtained");

    let id = record["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/api/calls/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id);

    let (status, _) = send(&app, Method::GET, "/api/calls/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Session is gone; ending it again stores nothing
    send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "call_ended", "call_id": "c7"})),
    )
    .await;
    let (_, calls) = send(&app, Method::GET, "/api/calls", None).await;
    assert_eq!(calls["count"], 1);
}

#[tokio::test]
async fn test_calls_without_persistence() {
    let app = create_router(bare_state());
    let (status, _) = send(&app, Method::GET, "/api/calls", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_place_call() {
    let telephony = Arc::new(FakeTelephony {
        dialed: Mutex::new(Vec::new()),
    });
    let app = create_router(bare_state().with_telephony(telephony.clone()));

    let (status, _) = send(&app, Method::POST, "/api/call", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/api/call", Some(json!({"phone_number": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/call",
        Some(json!({"phone_number": "+79001234567"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["call_id"], "call_42");
    assert_eq!(*telephony.dialed.lock(), ["+79001234567"]);
}

#[tokio::test]
async fn test_place_call_failures() {
    let app = create_router(bare_state());
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/call",
        Some(json!({"phone_number": "+79001234567"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = create_router(bare_state().with_telephony(Arc::new(RejectingTelephony)));
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/call",
        Some(json!({"phone_number": "+79001234567"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_tts_returns_audio() {
    let tts = Arc::new(FakeTts {
        emotions: Mutex::new(Vec::new()),
    });
    let app = create_router(bare_state().with_tts(tts.clone()));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"text": "Добрый день", "emotion": "positive"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/ogg");
    let audio = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&audio[..], "alena:Добрый день".as_bytes());
    assert_eq!(*tts.emotions.lock(), [EmotionHint::Positive]);

    let (status, _) = send(&app, Method::POST, "/api/tts", Some(json!({"text": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recognition_events() {
    let app = create_router(bare_state().with_stt(Arc::new(EchoStt)));

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "start_recognition_session", "call_id": "c3"})),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["session_id"], "stt_c3");

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({
            "event": "process_audio_chunk",
            "call_id": "c3",
            "session_id": "stt_c3",
            "audio_data": BASE64.encode("Алло".as_bytes()),
        })),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["text"], "Алло");
    assert_eq!(body["reply"]["success"], true);
    assert_eq!(body["reply"]["response"]["call_id"], "c3");

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "process_audio_chunk", "call_id": "c3", "session_id": "stt_c3"})),
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing session_id or audio_data");

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "end_recognition_session", "call_id": "c3", "session_id": "stt_c3"})),
    )
    .await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_recognition_without_stt() {
    let app = create_router(bare_state());
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/voxi/events",
        Some(json!({"event": "start_recognition_session", "call_id": "c3"})),
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Speech recognition not configured");
}

#[tokio::test]
async fn test_dialog_endpoint_and_cleanup() {
    let app = create_router(bare_state());

    let (status, body) = send(&app, Method::POST, "/api/test/dialog", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["test"], true);
    assert_eq!(body["input"], "Привет, как дела?");
    assert_eq!(body["result"]["success"], true);

    let call_id = body["result"]["response"]["call_id"].as_str().unwrap().to_string();
    assert!(call_id.starts_with("test_"));

    let (_, body) = send(&app, Method::POST, "/api/cleanup", None).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["removed"], 0);
    assert_eq!(body["active_sessions"], 1);

    let (_, body) = send(&app, Method::DELETE, &format!("/api/sessions/{}", call_id), None).await;
    assert_eq!(body["success"], true);

    let (_, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(health["active_sessions"], 0);
}

#[tokio::test]
async fn test_metrics_disabled() {
    let app = create_router(bare_state());
    let (status, _) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
