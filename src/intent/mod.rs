//! Intent classification for transcript segments.
//!
//! A small TF-IDF + softmax linear model decides what the user meant
//! (append an expression, calculate, clear, ...). The model is an immutable
//! snapshot held by [`ModelStore`]; reloading swaps the snapshot atomically so
//! in-flight classifications finish against the version they started with.

mod dataset;
mod features;
mod model;
mod store;
#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::expression;
use crate::protocol::Action;

pub use dataset::{
    default_dataset, ensure_dataset, load_dataset, merge_samples, number_to_words, save_dataset,
    synthetic_expression_corpus, TrainingSample,
};
pub use model::{ClassifierModel, Prediction, TrainingOptions};
pub use store::ModelStore;

/// Below this confidence the result is still applied, but the user is asked
/// to repeat if it was wrong.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Labels the classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    #[serde(alias = "expression")]
    AppendExpression,
    Calculate,
    Clear,
    Backspace,
    Stop,
    Noop,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 6] = [
        IntentLabel::AppendExpression,
        IntentLabel::Calculate,
        IntentLabel::Clear,
        IntentLabel::Backspace,
        IntentLabel::Stop,
        IntentLabel::Noop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntentLabel::AppendExpression => "append_expression",
            IntentLabel::Calculate => "calculate",
            IntentLabel::Clear => "clear",
            IntentLabel::Backspace => "backspace",
            IntentLabel::Stop => "stop",
            IntentLabel::Noop => "noop",
        }
    }

    /// Accepts wire names plus the legacy `expression` spelling.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "append_expression" | "expression" => Some(IntentLabel::AppendExpression),
            "calculate" => Some(IntentLabel::Calculate),
            "clear" => Some(IntentLabel::Clear),
            "backspace" => Some(IntentLabel::Backspace),
            "stop" => Some(IntentLabel::Stop),
            "noop" => Some(IntentLabel::Noop),
            _ => None,
        }
    }

    /// Calculator action for this label; `noop` has none.
    pub fn action(self) -> Option<Action> {
        match self {
            IntentLabel::AppendExpression => Some(Action::AppendExpression),
            IntentLabel::Calculate => Some(Action::Calculate),
            IntentLabel::Clear => Some(Action::Clear),
            IntentLabel::Backspace => Some(Action::Backspace),
            IntentLabel::Stop => Some(Action::Stop),
            IntentLabel::Noop => None,
        }
    }
}

/// Classifier output plus the normalized expression for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedIntent {
    pub label: IntentLabel,
    pub confidence: f32,
    pub expression: Option<String>,
    pub expression_confidence: f32,
    pub model_version: u64,
}

impl ClassifiedIntent {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }
}

/// Runs the normalizer and the active model snapshot over a piece of text.
#[derive(Clone)]
pub struct IntentClassifier {
    store: Arc<ModelStore>,
}

impl IntentClassifier {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Label and confidence only. Captures the active snapshot once.
    pub fn classify(&self, text: &str) -> Prediction {
        let snapshot = self.store.active();
        snapshot.predict(text)
    }

    /// Label, confidence, and normalized expression.
    ///
    /// An expression label with nothing usable to append falls back to
    /// `noop`; a `noop` guess that still normalizes to an expression is
    /// promoted to `append_expression`.
    pub fn interpret(&self, text: &str) -> ClassifiedIntent {
        let snapshot = self.store.active();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ClassifiedIntent {
                label: IntentLabel::Noop,
                confidence: 0.0,
                expression: None,
                expression_confidence: 0.0,
                model_version: snapshot.version(),
            };
        }

        let prediction = snapshot.predict(trimmed);
        let normalized = expression::normalize(trimmed);
        let label = match (prediction.label, normalized.expression.is_some()) {
            (IntentLabel::AppendExpression, false) => IntentLabel::Noop,
            (IntentLabel::Noop, true) => IntentLabel::AppendExpression,
            (label, _) => label,
        };

        ClassifiedIntent {
            label,
            confidence: prediction.confidence,
            expression: normalized.expression,
            expression_confidence: normalized.confidence,
            model_version: prediction.version,
        }
    }
}
