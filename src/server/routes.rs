use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::AppState;
use crate::error::VoiceError;
use crate::intent::{IntentLabel, ModelStore};
use crate::protocol::{StatusLevel, VoiceEvent};

fn error_response(code: StatusCode, err: &VoiceError) -> Response {
    (
        code,
        Json(json!({
            "status": "error",
            "reason": err.reason(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

fn internal_error(detail: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": detail })),
    )
        .into_response()
}

// ============================================================================
// Session control
// ============================================================================

pub(super) async fn start_voice(State(state): State<AppState>) -> Response {
    match state.session.start() {
        Ok(session_state) => Json(json!({ "status": session_state.as_str() })).into_response(),
        Err(err) => error_response(StatusCode::SERVICE_UNAVAILABLE, &err),
    }
}

pub(super) async fn stop_voice(State(state): State<AppState>) -> Json<serde_json::Value> {
    let session = state.session.clone();
    let stopped = tokio::task::spawn_blocking(move || session.stop())
        .await
        .unwrap_or_else(|_| state.session.state());
    Json(json!({ "status": stopped.as_str() }))
}

pub(super) async fn voice_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let availability = state.session.source_available();
    let intents: Vec<&str> = IntentLabel::ALL.iter().map(|label| label.as_str()).collect();
    let model = state.classifier.store().active();
    Json(json!({
        "status": state.session.state().as_str(),
        "supported_intents": intents,
        "model_version": model.version(),
        "vocabulary_size": model.vocabulary_len(),
        "source": state.session.source_name(),
        "mic_available": availability.is_ok(),
        "mic_error": availability.err().map(|err| err.to_string()),
        "subscribers": state.hub.subscriber_count(),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct SegmentRequest {
    #[serde(default)]
    transcript: String,
}

pub(super) async fn submit_segment(
    State(state): State<AppState>,
    Json(request): Json<SegmentRequest>,
) -> Response {
    if request.transcript.trim().is_empty() {
        return bad_request("Empty transcript");
    }
    match state.session.submit_segment(&request.transcript) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response(),
        Err(err @ VoiceError::SegmentQueueFull) => {
            error_response(StatusCode::TOO_MANY_REQUESTS, &err)
        }
        Err(err) => error_response(StatusCode::CONFLICT, &err),
    }
}

// ============================================================================
// Model
// ============================================================================

pub(super) async fn reload_model(State(state): State<AppState>) -> Response {
    let store: Arc<ModelStore> = Arc::clone(state.classifier.store());
    let outcome = tokio::task::spawn_blocking(move || store.reload()).await;
    match outcome {
        Ok(Ok(version)) => {
            state.hub.publish(VoiceEvent::status(
                state.session.state().stream_state(),
                format!("Intent model reloaded (version {version})"),
                StatusLevel::Info,
            ));
            Json(json!({ "status": "model reloaded", "version": version })).into_response()
        }
        Ok(Err(err)) => {
            tracing::warn!("model reload failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err)
        }
        Err(err) => internal_error(format!("reload task failed: {err}")),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct InterpretRequest {
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Serialize)]
pub(super) struct InterpretResponse {
    #[serde(rename = "type")]
    kind: &'static str,
    raw: String,
    intent: IntentLabel,
    confidence: f32,
    action: &'static str,
    expression: Option<String>,
    expression_confidence: f32,
    model_version: u64,
    low_confidence: bool,
}

pub(super) async fn interpret(
    State(state): State<AppState>,
    Json(request): Json<InterpretRequest>,
) -> Response {
    let text = request.transcript.trim();
    if text.is_empty() {
        return bad_request("Empty transcript");
    }
    let intent = state.classifier.interpret(text);
    let action = intent
        .label
        .action()
        .map(|action| action.as_str())
        .unwrap_or("noop");
    Json(InterpretResponse {
        kind: "result",
        raw: text.to_string(),
        intent: intent.label,
        confidence: intent.confidence,
        action,
        low_confidence: intent.is_low_confidence(),
        expression: intent.expression,
        expression_confidence: intent.expression_confidence,
        model_version: intent.model_version,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct SampleRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    label: String,
}

pub(super) async fn add_sample(
    State(state): State<AppState>,
    Json(request): Json<SampleRequest>,
) -> Response {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return bad_request("Empty sample text");
    }
    let Some(label) = IntentLabel::parse(&request.label) else {
        return bad_request(&format!("Unsupported label: {}", request.label));
    };
    let store: Arc<ModelStore> = Arc::clone(state.classifier.store());
    match tokio::task::spawn_blocking(move || store.add_sample(&text, label)).await {
        Ok(Ok(count)) => (
            StatusCode::CREATED,
            Json(json!({ "status": "added", "label": label, "samples": count })),
        )
            .into_response(),
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err),
        Err(err) => internal_error(format!("sample task failed: {err}")),
    }
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}
