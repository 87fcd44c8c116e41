use std::time::{Duration, Instant};

use super::buffer::TranscriptBuffer;
use super::phrases::{self, TriggerKind};
use crate::expression;
use crate::intent::{ClassifiedIntent, IntentClassifier, IntentLabel, LOW_CONFIDENCE_THRESHOLD};
use crate::protocol::{Action, StatusLevel, StreamState, VoiceEvent};
use crate::telemetry::log_content_enabled;

pub const DEFAULT_DEBOUNCE_MS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSettings {
    /// Minimum spacing between partial flushes of a dirty buffer.
    pub debounce: Duration,
    pub low_confidence_threshold: f32,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Events produced by one ingest or tick, in emission order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Flush {
    pub events: Vec<VoiceEvent>,
    /// A stop command was heard; the session should shut down.
    pub stop_requested: bool,
}

impl Flush {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && !self.stop_requested
    }

    fn push(&mut self, event: VoiceEvent) {
        self.events.push(event);
    }
}

/// Turns raw transcript segments into calculator events.
pub struct TriggerEngine {
    classifier: IntentClassifier,
    settings: TriggerSettings,
    buffer: TranscriptBuffer,
    last_partial: Option<String>,
    last_partial_at: Option<Instant>,
}

impl TriggerEngine {
    pub fn new(classifier: IntentClassifier, settings: TriggerSettings) -> Self {
        Self {
            classifier,
            settings,
            buffer: TranscriptBuffer::new(),
            last_partial: None,
            last_partial_at: None,
        }
    }

    pub fn buffer_text(&self) -> &str {
        self.buffer.text()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_partial = None;
        self.last_partial_at = None;
    }

    /// Ingest one recognized segment.
    pub fn ingest(&mut self, segment: &str, now: Instant) -> Flush {
        let mut flush = Flush::default();
        let segment = segment.trim();
        if segment.is_empty() {
            return flush;
        }
        if log_content_enabled() {
            tracing::debug!(segment, "transcript segment");
        }

        if phrases::contains_stop(segment) {
            self.reset();
            flush.push(VoiceEvent::command(Action::Stop).with_origin(IntentLabel::Stop, segment));
            flush.stop_requested = true;
            return flush;
        }

        if phrases::contains_backspace(segment)
            && expression::normalize(segment).expression.is_none()
        {
            flush.push(
                VoiceEvent::command(Action::Backspace).with_origin(IntentLabel::Backspace, segment),
            );
            return flush;
        }

        self.buffer.append(segment, now);
        self.flush_triggers(&mut flush);
        flush
    }

    /// Periodic check from the worker loop. Emits a partial
    /// `append_expression` for a dirty buffer once the debounce interval has
    /// passed since the last partial (or since the buffer became dirty).
    pub fn tick(&mut self, now: Instant) -> Flush {
        let mut flush = Flush::default();
        let Some(dirty_since) = self.buffer.dirty_since() else {
            return flush;
        };
        if self.buffer.is_empty() {
            self.buffer.mark_clean();
            return flush;
        }
        let reference = self.last_partial_at.unwrap_or(dirty_since);
        if now.saturating_duration_since(reference) < self.settings.debounce {
            return flush;
        }

        self.buffer.mark_clean();
        self.last_partial_at = Some(now);
        let text = self.buffer.text().to_string();
        let intent = self.classifier.interpret(&text);

        if intent.expression.is_none() && intent.confidence >= self.settings.low_confidence_threshold
        {
            let command = match intent.label {
                IntentLabel::Clear => Some(Action::Clear),
                IntentLabel::Backspace => Some(Action::Backspace),
                IntentLabel::Stop => Some(Action::Stop),
                _ => None,
            };
            if let Some(action) = command {
                tracing::debug!(action = action.as_str(), "partial classified as command");
                self.reset();
                flush.push(VoiceEvent::command(action).with_origin(intent.label, &text));
                flush.stop_requested = action == Action::Stop;
                return flush;
            }
        }

        if let Some(expr) = intent.expression.clone() {
            if self.last_partial.as_deref() != Some(expr.as_str()) {
                self.warn_if_low_confidence(&intent, &mut flush);
                flush.push(
                    VoiceEvent::result(
                        Action::AppendExpression,
                        Some(expr.clone()),
                        intent.expression_confidence,
                        intent.confidence,
                    )
                    .with_origin(intent.label, &text),
                );
                self.last_partial = Some(expr);
            }
        }
        flush
    }

    /// Flush every trigger in the buffer, earliest first. A clear trigger
    /// leaves the buffer empty even when text follows the phrase.
    fn flush_triggers(&mut self, flush: &mut Flush) {
        let mut cleared = false;
        while let Some(found) = phrases::find_trigger(self.buffer.text()) {
            let phrase = self.buffer.text()[found.start..found.end].to_string();
            let preceding = self.buffer.take_through(found.start, found.end);
            match found.kind {
                TriggerKind::Clear => {
                    cleared = true;
                    self.last_partial = None;
                    self.last_partial_at = None;
                    flush.push(
                        VoiceEvent::command(Action::Clear).with_origin(IntentLabel::Clear, &phrase),
                    );
                }
                TriggerKind::Calculate => self.flush_calculate(&preceding, &phrase, flush),
            }
        }
        if cleared || self.buffer.is_empty() {
            self.buffer.clear();
        }
    }

    fn flush_calculate(&mut self, preceding: &str, phrase: &str, flush: &mut Flush) {
        self.last_partial = None;
        self.last_partial_at = None;

        if preceding.is_empty() {
            flush.push(
                VoiceEvent::result(Action::Calculate, None, 0.0, 1.0)
                    .with_origin(IntentLabel::Calculate, phrase),
            );
            return;
        }

        let intent = self.classifier.interpret(preceding);
        let raw = format!("{preceding} {phrase}");
        if let Some(expr) = &intent.expression {
            self.warn_if_low_confidence(&intent, flush);
            flush.push(
                VoiceEvent::result(
                    Action::AppendExpression,
                    Some(expr.clone()),
                    intent.expression_confidence,
                    intent.confidence,
                )
                .with_origin(intent.label, &raw),
            );
        }
        flush.push(
            VoiceEvent::result(
                Action::Calculate,
                intent.expression.clone(),
                intent.expression_confidence,
                intent.confidence,
            )
            .with_origin(IntentLabel::Calculate, &raw),
        );
    }

    fn warn_if_low_confidence(&self, intent: &ClassifiedIntent, flush: &mut Flush) {
        if intent.confidence >= self.settings.low_confidence_threshold {
            return;
        }
        tracing::debug!(
            confidence = intent.confidence,
            model_version = intent.model_version,
            "low confidence result"
        );
        flush.push(VoiceEvent::status(
            StreamState::Listening,
            format!(
                "Not sure about that ({:.0}% confident); repeat it if the result is wrong",
                intent.confidence * 100.0
            ),
            StatusLevel::Info,
        ));
    }
}
