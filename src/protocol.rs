//! Event payloads pushed to stream subscribers.
//!
//! Every event serializes to a single JSON object tagged by `"type"`. The
//! server frames each one as a server-sent event named `message`; heartbeats
//! use a separate `ping` event with an empty object body.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::VoiceError;
use crate::intent::IntentLabel;

/// SSE event name for regular payloads.
pub const SSE_MESSAGE_EVENT: &str = "message";
/// SSE event name for heartbeats.
pub const SSE_HEARTBEAT_EVENT: &str = "ping";

// ============================================================================
// Events (server → subscribers)
// ============================================================================

/// Payload delivered to every subscriber. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    Status(StatusEvent),
    Result(ResultEvent),
}

/// Session state change or informational message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub state: StreamState,
    pub message: String,
    pub level: StatusLevel,
    #[serde(default)]
    pub timestamp: f64,
}

/// A command for the host calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    pub action: Action,
    /// Always serialized; `null` for commands that carry no expression.
    pub expression: Option<String>,
    pub expression_confidence: f32,
    /// Classifier confidence for the utterance that produced this result.
    #[serde(default)]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default)]
    pub timestamp: f64,
}

/// Session state as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Calibrating,
    Listening,
    Error,
}

impl StreamState {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Calibrating => "calibrating",
            StreamState::Listening => "listening",
            StreamState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Debug,
}

/// Calculator command carried by a result event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AppendExpression,
    Calculate,
    Clear,
    Backspace,
    Stop,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::AppendExpression => "append_expression",
            Action::Calculate => "calculate",
            Action::Clear => "clear",
            Action::Backspace => "backspace",
            Action::Stop => "stop",
        }
    }
}

// ============================================================================
// Construction helpers
// ============================================================================

impl VoiceEvent {
    pub fn status(state: StreamState, message: impl Into<String>, level: StatusLevel) -> Self {
        VoiceEvent::Status(StatusEvent {
            state,
            message: message.into(),
            level,
            timestamp: unix_timestamp(),
        })
    }

    /// Command without an expression (`clear`, `backspace`, `stop`).
    pub fn command(action: Action) -> Self {
        VoiceEvent::Result(ResultEvent {
            action,
            expression: None,
            expression_confidence: 0.0,
            confidence: 1.0,
            intent: None,
            raw: None,
            timestamp: unix_timestamp(),
        })
    }

    pub fn result(
        action: Action,
        expression: Option<String>,
        expression_confidence: f32,
        confidence: f32,
    ) -> Self {
        VoiceEvent::Result(ResultEvent {
            action,
            expression,
            expression_confidence,
            confidence,
            intent: None,
            raw: None,
            timestamp: unix_timestamp(),
        })
    }

    /// Attach the classifier label and source text to a result event.
    pub fn with_origin(mut self, intent: IntentLabel, raw: &str) -> Self {
        if let VoiceEvent::Result(result) = &mut self {
            result.intent = Some(intent);
            if !raw.is_empty() {
                result.raw = Some(raw.to_string());
            }
        }
        self
    }

    pub fn action(&self) -> Option<Action> {
        match self {
            VoiceEvent::Result(result) => Some(result.action),
            VoiceEvent::Status(_) => None,
        }
    }

    pub fn to_json(&self) -> String {
        // Plain enums of strings and numbers; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a payload received from the stream. Unknown `type` or `action`
    /// tags are rejected rather than ignored.
    pub fn from_json(data: &str) -> Result<Self, VoiceError> {
        serde_json::from_str(data).map_err(|err| VoiceError::MalformedEventPayload(err.to_string()))
    }
}

pub(crate) fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
