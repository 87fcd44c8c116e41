use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::dataset::TrainingSample;
use super::features::{l2_normalize, smoothed_idf, softmax, term_counts};
use super::IntentLabel;
use crate::error::VoiceError;

/// Knobs for the softmax regression trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 12,
            learning_rate: 0.3,
            l2: 1e-4,
        }
    }
}

/// Top label for a piece of text against one model snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: IntentLabel,
    pub confidence: f32,
    pub version: u64,
}

/// Immutable classifier snapshot: vocabulary, IDF weights, one weight row
/// and bias per label, and a version id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    version: u64,
    labels: Vec<IntentLabel>,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

type SparseVector = Vec<(usize, f32)>;

impl ClassifierModel {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Train a fresh snapshot. Deterministic for a given sample order.
    pub fn train(
        samples: &[TrainingSample],
        version: u64,
        options: TrainingOptions,
    ) -> Result<Self, VoiceError> {
        if samples.is_empty() {
            return Err(VoiceError::ClassifierLoadFailure(
                "cannot train intent classifier without samples".to_string(),
            ));
        }

        let documents: Vec<BTreeMap<String, u32>> =
            samples.iter().map(|s| term_counts(&s.text)).collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &documents {
            for term in doc.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        if document_frequency.is_empty() {
            return Err(VoiceError::ClassifierLoadFailure(
                "training samples contain no usable words".to_string(),
            ));
        }

        let vocabulary: BTreeMap<String, usize> = document_frequency
            .keys()
            .enumerate()
            .map(|(idx, term)| ((*term).to_string(), idx))
            .collect();
        let idf: Vec<f32> = document_frequency
            .values()
            .map(|df| smoothed_idf(documents.len(), *df))
            .collect();

        let labels = IntentLabel::ALL.to_vec();
        let mut model = Self {
            version,
            weights: vec![vec![0.0; vocabulary.len()]; labels.len()],
            bias: vec![0.0; labels.len()],
            labels,
            vocabulary,
            idf,
        };

        let vectors: Vec<SparseVector> = documents
            .iter()
            .map(|counts| model.vectorize_counts(counts))
            .collect();
        let targets: Vec<usize> = samples
            .iter()
            .map(|s| model.label_index(s.label))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                VoiceError::ClassifierLoadFailure("sample label outside model labels".to_string())
            })?;
        let schedule = balanced_schedule(&targets, model.labels.len());

        for epoch in 0..options.epochs {
            let rate = options.learning_rate / (1.0 + epoch as f32 * 0.1);
            for &idx in &schedule {
                let (vector, target) = (&vectors[idx], targets[idx]);
                let probs = softmax(&model.scores(vector));
                for (k, p) in probs.iter().enumerate() {
                    let indicator = if k == target { 1.0 } else { 0.0 };
                    let gradient = p - indicator;
                    model.bias[k] -= rate * gradient;
                    let row = &mut model.weights[k];
                    for &(j, x) in vector {
                        row[j] -= rate * (gradient * x + options.l2 * row[j]);
                    }
                }
            }
        }

        Ok(model)
    }

    /// Score `text` against this snapshot. Out-of-vocabulary terms weigh zero.
    pub fn predict(&self, text: &str) -> Prediction {
        if text.trim().is_empty() {
            return Prediction {
                label: IntentLabel::Noop,
                confidence: 0.0,
                version: self.version,
            };
        }
        let vector = self.vectorize_counts(&term_counts(text));
        let probs = softmax(&self.scores(&vector));
        let (best, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |acc, (idx, p)| {
                if p > acc.1 {
                    (idx, p)
                } else {
                    acc
                }
            });
        Prediction {
            label: self.labels.get(best).copied().unwrap_or(IntentLabel::Noop),
            confidence: confidence.clamp(0.0, 1.0),
            version: self.version,
        }
    }

    /// Check dimensions after deserializing a persisted snapshot.
    pub fn validate(&self) -> Result<(), VoiceError> {
        let fail = |msg: String| Err(VoiceError::ClassifierLoadFailure(msg));
        if self.labels.is_empty() {
            return fail("model has no labels".to_string());
        }
        if self.weights.len() != self.labels.len() || self.bias.len() != self.labels.len() {
            return fail(format!(
                "model has {} labels but {} weight rows and {} biases",
                self.labels.len(),
                self.weights.len(),
                self.bias.len()
            ));
        }
        if self.idf.len() != self.vocabulary.len() {
            return fail("idf length does not match vocabulary".to_string());
        }
        if self.weights.iter().any(|row| row.len() != self.idf.len()) {
            return fail("weight row length does not match vocabulary".to_string());
        }
        if self.vocabulary.values().any(|&idx| idx >= self.idf.len()) {
            return fail("vocabulary index out of range".to_string());
        }
        Ok(())
    }

    /// Load a persisted snapshot and check its dimensions.
    pub fn load(path: &Path) -> Result<Self, VoiceError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            VoiceError::ClassifierLoadFailure(format!(
                "failed to read model {}: {err}",
                path.display()
            ))
        })?;
        let model: Self = serde_json::from_str(&raw).map_err(|err| {
            VoiceError::ClassifierLoadFailure(format!("invalid model {}: {err}", path.display()))
        })?;
        model.validate()?;
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    fn label_index(&self, label: IntentLabel) -> Option<usize> {
        self.labels.iter().position(|l| *l == label)
    }

    fn vectorize_counts(&self, counts: &BTreeMap<String, u32>) -> SparseVector {
        let mut vector: SparseVector = counts
            .iter()
            .filter_map(|(term, count)| {
                self.vocabulary
                    .get(term)
                    .map(|&idx| (idx, *count as f32 * self.idf[idx]))
            })
            .collect();
        l2_normalize(&mut vector);
        vector
    }

    fn scores(&self, vector: &SparseVector) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| bias + vector.iter().map(|&(j, x)| row[j] * x).sum::<f32>())
            .collect()
    }
}

/// Round-robin over labels, cycling the smaller classes, so every present
/// label contributes as many updates per epoch as the largest one. Keeps a
/// handful of command samples from being drowned out by the synthetic
/// expression corpus.
fn balanced_schedule(targets: &[usize], classes: usize) -> Vec<usize> {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); classes];
    for (idx, &target) in targets.iter().enumerate() {
        by_class[target].push(idx);
    }
    by_class.retain(|members| !members.is_empty());
    let rounds = by_class.iter().map(Vec::len).max().unwrap_or(0);

    let mut schedule = Vec::with_capacity(rounds * by_class.len());
    for round in 0..rounds {
        for members in &by_class {
            schedule.push(members[round % members.len()]);
        }
    }
    schedule
}
