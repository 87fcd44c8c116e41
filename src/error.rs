//! Failure taxonomy shared by the pipeline, the HTTP surface, and the client.

use std::fmt;

/// Errors surfaced by the voice pipeline.
///
/// Pipeline code converts most of these into `status` events instead of
/// returning them to the transport; the HTTP layer maps the remainder onto
/// status codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    /// Microphone or recognition engine could not be acquired.
    ResourceUnavailable(String),
    /// Training data missing or unusable; the active model was kept.
    ClassifierLoadFailure(String),
    /// Event stream dropped; the client may reconnect.
    StreamDisconnect(String),
    /// Client gave up after the bounded number of reconnect attempts.
    ReconnectExhausted { attempts: u32 },
    /// A received event could not be parsed.
    MalformedEventPayload(String),
    /// Segment submitted while no session is listening.
    SessionNotListening,
    /// Ingestion queue is full; the segment was dropped.
    SegmentQueueFull,
}

impl VoiceError {
    /// Stable short reason used in HTTP error bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            VoiceError::ResourceUnavailable(_) => "resource-unavailable",
            VoiceError::ClassifierLoadFailure(_) => "classifier-load-failure",
            VoiceError::StreamDisconnect(_) => "stream-disconnect",
            VoiceError::ReconnectExhausted { .. } => "reconnect-exhausted",
            VoiceError::MalformedEventPayload(_) => "malformed-event-payload",
            VoiceError::SessionNotListening => "session-not-listening",
            VoiceError::SegmentQueueFull => "segment-queue-full",
        }
    }
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceError::ResourceUnavailable(msg) => write!(f, "speech resource unavailable: {msg}"),
            VoiceError::ClassifierLoadFailure(msg) => {
                write!(f, "intent model reload failed: {msg}")
            }
            VoiceError::StreamDisconnect(msg) => write!(f, "event stream disconnected: {msg}"),
            VoiceError::ReconnectExhausted { attempts } => {
                write!(f, "gave up after {attempts} reconnect attempts")
            }
            VoiceError::MalformedEventPayload(msg) => write!(f, "malformed event payload: {msg}"),
            VoiceError::SessionNotListening => write!(f, "voice session is not listening"),
            VoiceError::SegmentQueueFull => write!(f, "transcript segment queue is full"),
        }
    }
}

impl std::error::Error for VoiceError {}
