use super::*;
use crate::intent::{default_dataset, ModelStore};
use crate::protocol::{Action, VoiceEvent};
use crate::session::{ExternalFeed, SessionSettings, SpeechSource, UnavailableSource};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use std::env;
use std::fs;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

fn shared_store() -> Arc<ModelStore> {
    static STORE: OnceLock<Arc<ModelStore>> = OnceLock::new();
    STORE
        .get_or_init(|| Arc::new(ModelStore::from_samples(default_dataset()).unwrap()))
        .clone()
}

fn state_with(source: Arc<dyn SpeechSource>, store: Arc<ModelStore>) -> AppState {
    let hub = EventHub::new(16, Duration::from_secs(60));
    let classifier = IntentClassifier::new(store);
    let settings = SessionSettings {
        tick: Duration::from_millis(10),
        ..SessionSettings::default()
    };
    let session = SessionManager::new(source, classifier.clone(), hub.clone(), settings);
    AppState::new(session, hub, classifier)
}

fn state() -> AppState {
    state_with(Arc::new(ExternalFeed), shared_store())
}

async fn call(state: &AppState, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = call(&state(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn start_and_stop_report_status() {
    let state = state();
    let (status, body) = call(&state, "POST", "/voice/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "listening");

    let (_, body) = call(&state, "GET", "/voice/status", None).await;
    assert_eq!(body["status"], "listening");
    assert_eq!(body["mic_available"], true);
    assert_eq!(body["supported_intents"].as_array().unwrap().len(), 6);
    assert!(body["vocabulary_size"].as_u64().unwrap() > 0);

    let (status, body) = call(&state, "POST", "/voice/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    let (_, body) = call(&state, "POST", "/voice/stop", None).await;
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn start_without_resource_is_503() {
    let state = state_with(
        Arc::new(UnavailableSource::new("no microphone detected")),
        shared_store(),
    );
    let (status, body) = call(&state, "POST", "/voice/start", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["reason"], "resource-unavailable");

    let (_, body) = call(&state, "GET", "/voice/status", None).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["mic_available"], false);
}

#[tokio::test]
async fn segment_requires_listening_session() {
    let state = state();
    let (status, _) = call(
        &state,
        "POST",
        "/voice/segment",
        Some(r#"{"transcript": "three plus four"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    call(&state, "POST", "/voice/start", None).await;
    let (status, _) = call(
        &state,
        "POST",
        "/voice/segment",
        Some(r#"{"transcript": "three plus four"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = call(&state, "POST", "/voice/segment", Some(r#"{"transcript": " "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    call(&state, "POST", "/voice/stop", None).await;
}

#[tokio::test]
async fn interpret_classifies_and_rejects_empty() {
    let state = state();
    let (status, body) = call(
        &state,
        "POST",
        "/voice/interpret",
        Some(r#"{"transcript": "seven times five"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "result");
    assert_eq!(body["intent"], "append_expression");
    assert_eq!(body["action"], "append_expression");
    assert_eq!(body["expression"], "7*5");

    let (status, _) = call(&state, "POST", "/voice/interpret", Some(r#"{"transcript": ""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reload_without_dataset_is_500_and_keeps_version() {
    let state = state_with(
        Arc::new(ExternalFeed),
        Arc::new(ModelStore::from_samples(default_dataset()).unwrap()),
    );
    let (status, body) = call(&state, "POST", "/voice/reload-model", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["reason"], "classifier-load-failure");
    assert_eq!(state.classifier.store().version(), 1);
}

#[tokio::test]
async fn samples_then_reload_bumps_version() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = env::temp_dir().join(format!("voicecalc_server_{unique}"));
    let store = ModelStore::open(&dir.join("dataset.json"), &dir.join("model.json")).unwrap();
    let state = state_with(Arc::new(ExternalFeed), Arc::new(store));

    let (status, _) = call(
        &state,
        "POST",
        "/voice/samples",
        Some(r#"{"text": "nuke it", "label": "dance"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &state,
        "POST",
        "/voice/samples",
        Some(r#"{"text": "nuke it", "label": "clear"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["label"], "clear");

    let (status, body) = call(&state, "POST", "/voice/reload-model", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn stream_frames_events_as_sse() {
    let state = state();
    let request = Request::builder()
        .uri("/voice/stream")
        .body(Body::empty())
        .unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(state.hub.subscriber_count(), 1);

    state.hub.publish(VoiceEvent::command(Action::Clear));
    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frame = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(frame.contains("event: message"));
    assert!(frame.contains(r#""type":"result""#));
    assert!(frame.contains(r#""action":"clear""#));
    assert!(frame.contains(r#""expression":null"#));

    drop(body);
    assert_eq!(state.hub.subscriber_count(), 0);
}

#[tokio::test]
async fn stream_heartbeat_uses_ping_event() {
    let hub = EventHub::new(4, Duration::from_millis(20));
    let classifier = IntentClassifier::new(shared_store());
    let session = SessionManager::new(
        Arc::new(ExternalFeed),
        classifier.clone(),
        hub.clone(),
        SessionSettings::default(),
    );
    let state = AppState::new(session, hub, classifier);
    let request = Request::builder()
        .uri("/voice/stream")
        .body(Body::empty())
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();
    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frame = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(frame.contains("event: ping"));
    assert!(frame.contains("data: {}"));
}
