//! Transcript buffering and trigger-phrase detection.
//!
//! Segments from the speech engine accumulate in a [`TranscriptBuffer`].
//! Stop and backspace phrases act at once; clear and calculate phrases flush
//! the buffer through the normalizer and classifier; anything else is flushed
//! as a debounced partial on the worker tick.

mod buffer;
mod engine;
mod phrases;
#[cfg(test)]
mod tests;

pub use buffer::TranscriptBuffer;
pub use engine::{Flush, TriggerEngine, TriggerSettings, DEFAULT_DEBOUNCE_MS};
