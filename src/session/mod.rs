//! Voice session lifecycle and the transcript ingestion worker.

mod manager;
mod source;
#[cfg(test)]
mod tests;

pub use manager::{
    SessionManager, SessionSettings, SessionState, DEFAULT_SEGMENT_CAPACITY, DEFAULT_TICK_MS,
};
#[cfg(feature = "mic-probe")]
pub use source::MicrophoneProbe;
pub use source::{ExternalFeed, SpeechSource, UnavailableSource};
