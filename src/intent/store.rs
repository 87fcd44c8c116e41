use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use super::dataset::{
    ensure_dataset, load_dataset, merge_samples, save_dataset, synthetic_expression_corpus,
    TrainingSample,
};
use super::model::{ClassifierModel, TrainingOptions};
use super::IntentLabel;
use crate::error::VoiceError;
use crate::lock::{lock_or_recover, read_or_recover, write_or_recover};

/// Holds the active classifier snapshot and swaps it on reload.
///
/// Readers clone the `Arc` under a short read lock and release it at once, so
/// a classification in flight keeps the snapshot it started with even if a
/// reload lands halfway through.
pub struct ModelStore {
    active: RwLock<Arc<ClassifierModel>>,
    dataset_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    options: TrainingOptions,
    reload_lock: Mutex<()>,
}

impl ModelStore {
    /// Bootstrap the dataset if needed, then load the persisted model or
    /// train a new one when it is missing or unreadable.
    pub fn open(dataset_path: &Path, model_path: &Path) -> Result<Self, VoiceError> {
        let options = TrainingOptions::default();
        let samples = ensure_dataset(dataset_path)?;
        let model = match ClassifierModel::load(model_path) {
            Ok(model) => {
                tracing::info!(
                    path = %model_path.display(),
                    version = model.version(),
                    "loaded intent model"
                );
                model
            }
            Err(err) => {
                if model_path.exists() {
                    tracing::warn!("retraining intent model: {err}");
                }
                let model = train_with_corpus(samples, 1, options)?;
                persist(&model, model_path);
                model
            }
        };
        Ok(Self {
            active: RwLock::new(Arc::new(model)),
            dataset_path: Some(dataset_path.to_path_buf()),
            model_path: Some(model_path.to_path_buf()),
            options,
            reload_lock: Mutex::new(()),
        })
    }

    /// In-memory store with no backing files. Reload and sample appends fail.
    pub fn from_model(model: ClassifierModel) -> Self {
        Self {
            active: RwLock::new(Arc::new(model)),
            dataset_path: None,
            model_path: None,
            options: TrainingOptions::default(),
            reload_lock: Mutex::new(()),
        }
    }

    /// In-memory store trained from `samples` plus the synthetic corpus.
    pub fn from_samples(samples: Vec<TrainingSample>) -> Result<Self, VoiceError> {
        let model = train_with_corpus(samples, 1, TrainingOptions::default())?;
        Ok(Self::from_model(model))
    }

    pub fn active(&self) -> Arc<ClassifierModel> {
        Arc::clone(&read_or_recover(&self.active, "model store active"))
    }

    pub fn version(&self) -> u64 {
        self.active().version()
    }

    pub fn dataset_path(&self) -> Option<&Path> {
        self.dataset_path.as_deref()
    }

    /// Retrain from the dataset file and swap the new snapshot in.
    ///
    /// Any failure before the swap leaves the active model untouched. A
    /// failure to persist the new model is only logged.
    pub fn reload(&self) -> Result<u64, VoiceError> {
        let _guard = lock_or_recover(&self.reload_lock, "model store reload");
        let dataset_path = self.dataset_path.as_deref().ok_or_else(|| {
            VoiceError::ClassifierLoadFailure("no training dataset configured".to_string())
        })?;
        let samples = load_dataset(dataset_path)?;
        let version = self.version() + 1;
        let model = train_with_corpus(samples, version, self.options)?;
        if let Some(model_path) = &self.model_path {
            persist(&model, model_path);
        }
        *write_or_recover(&self.active, "model store swap") = Arc::new(model);
        tracing::info!(version, "intent model reloaded");
        Ok(version)
    }

    /// Append a labeled sample to the dataset file. Takes effect on the next
    /// reload. Returns the dataset size afterwards.
    pub fn add_sample(&self, text: &str, label: IntentLabel) -> Result<usize, VoiceError> {
        let _guard = lock_or_recover(&self.reload_lock, "model store add sample");
        let dataset_path = self.dataset_path.as_deref().ok_or_else(|| {
            VoiceError::ClassifierLoadFailure("no training dataset configured".to_string())
        })?;
        let mut samples = ensure_dataset(dataset_path)?;
        samples.push(TrainingSample::new(text, label));
        let samples = merge_samples(samples);
        save_dataset(dataset_path, &samples).map_err(|err| {
            VoiceError::ClassifierLoadFailure(format!(
                "failed to write dataset {}: {err}",
                dataset_path.display()
            ))
        })?;
        Ok(samples.len())
    }
}

fn train_with_corpus(
    samples: Vec<TrainingSample>,
    version: u64,
    options: TrainingOptions,
) -> Result<ClassifierModel, VoiceError> {
    let merged = merge_samples(samples.into_iter().chain(synthetic_expression_corpus()));
    ClassifierModel::train(&merged, version, options)
}

fn persist(model: &ClassifierModel, path: &Path) {
    if let Err(err) = model.save(path) {
        tracing::warn!(path = %path.display(), "failed to persist intent model: {err}");
    }
}
