use super::*;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

fn shared_store() -> Arc<ModelStore> {
    static STORE: OnceLock<Arc<ModelStore>> = OnceLock::new();
    STORE
        .get_or_init(|| Arc::new(ModelStore::from_samples(default_dataset()).unwrap()))
        .clone()
}

fn temp_dir(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = env::temp_dir().join(format!("voicecalc_{label}_{unique}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn label_wire_names_and_legacy_alias() {
    assert_eq!(IntentLabel::parse("expression"), Some(IntentLabel::AppendExpression));
    assert_eq!(IntentLabel::parse(" Clear "), Some(IntentLabel::Clear));
    assert_eq!(IntentLabel::parse("dance"), None);
    let label: IntentLabel = serde_json::from_str("\"expression\"").unwrap();
    assert_eq!(label, IntentLabel::AppendExpression);
    assert_eq!(
        serde_json::to_string(&IntentLabel::AppendExpression).unwrap(),
        "\"append_expression\""
    );
    assert_eq!(IntentLabel::Noop.action(), None);
}

#[test]
fn number_words_match_speech() {
    assert_eq!(number_to_words(7), "seven");
    assert_eq!(number_to_words(46), "forty six");
    assert_eq!(number_to_words(90), "ninety");
    assert_eq!(number_to_words(305), "three hundred five");
    assert_eq!(number_to_words(-4), "minus four");
    assert_eq!(number_to_words(2024), "2024");
}

#[test]
fn merge_dedups_case_insensitively() {
    let merged = merge_samples(vec![
        TrainingSample::new("Clear", IntentLabel::Clear),
        TrainingSample::new("  clear ", IntentLabel::Backspace),
        TrainingSample::new("   ", IntentLabel::Noop),
        TrainingSample::new("undo", IntentLabel::Backspace),
    ]);
    assert_eq!(
        merged,
        vec![
            TrainingSample::new("Clear", IntentLabel::Clear),
            TrainingSample::new("undo", IntentLabel::Backspace),
        ]
    );
}

#[test]
fn synthetic_corpus_is_all_expressions() {
    let corpus = synthetic_expression_corpus();
    assert!(corpus.len() > 1000);
    assert!(corpus
        .iter()
        .all(|s| s.label == IntentLabel::AppendExpression));
    assert!(corpus.iter().any(|s| s.text == "seven times five"));
}

#[test]
fn commands_and_expressions_classify() {
    let classifier = IntentClassifier::new(shared_store());
    assert_eq!(classifier.classify("clear everything").label, IntentLabel::Clear);
    assert_eq!(classifier.classify("stop listening").label, IntentLabel::Stop);
    assert_eq!(classifier.classify("delete last").label, IntentLabel::Backspace);
    assert_eq!(classifier.classify("show result").label, IntentLabel::Calculate);

    let intent = classifier.interpret("seven times five");
    assert_eq!(intent.label, IntentLabel::AppendExpression);
    assert_eq!(intent.expression.as_deref(), Some("7*5"));
    assert!(!intent.is_low_confidence());
}

#[test]
fn empty_text_is_noop_with_zero_confidence() {
    let classifier = IntentClassifier::new(shared_store());
    let prediction = classifier.classify("   ");
    assert_eq!(prediction.label, IntentLabel::Noop);
    assert_eq!(prediction.confidence, 0.0);
    let intent = classifier.interpret("");
    assert_eq!(intent.label, IntentLabel::Noop);
    assert_eq!(intent.expression, None);
}

#[test]
fn unknown_words_do_not_become_expressions() {
    let classifier = IntentClassifier::new(shared_store());
    let intent = classifier.interpret("hello there");
    assert_eq!(intent.label, IntentLabel::Noop);
    assert_eq!(intent.expression, None);
}

#[test]
fn classification_is_deterministic() {
    let store = shared_store();
    let first = store.active().predict("twelve minus four");
    let second = store.active().predict("twelve minus four");
    assert_eq!(first, second);

    let retrained = ModelStore::from_samples(default_dataset()).unwrap();
    assert_eq!(retrained.active().predict("twelve minus four"), first);
}

#[test]
fn confidences_are_probabilities() {
    let store = shared_store();
    for text in ["clear", "banana", "three plus four", "what"] {
        let prediction = store.active().predict(text);
        assert!((0.0..=1.0).contains(&prediction.confidence), "{text}");
    }
}

#[test]
fn training_rejects_empty_input() {
    let err = ClassifierModel::train(&[], 1, TrainingOptions::default()).unwrap_err();
    assert_eq!(err.reason(), "classifier-load-failure");
}

#[test]
fn model_round_trips_through_disk() {
    let dir = temp_dir("model_disk");
    let path = dir.join("model.json");
    let model = shared_store().active();
    model.save(&path).unwrap();
    let loaded = ClassifierModel::load(&path).unwrap();
    assert_eq!(loaded.version(), model.version());
    assert_eq!(loaded.predict("clear"), model.predict("clear"));

    fs::write(&path, "{\"version\": 1}").unwrap();
    assert!(ClassifierModel::load(&path).is_err());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn open_bootstraps_dataset_and_model() {
    let dir = temp_dir("open");
    let dataset = dir.join("data").join("dataset.json");
    let model = dir.join("data").join("model.json");
    let store = ModelStore::open(&dataset, &model).unwrap();
    assert!(dataset.exists());
    assert!(model.exists());
    assert_eq!(store.version(), 1);
    assert_eq!(load_dataset(&dataset).unwrap(), default_dataset());

    let reopened = ModelStore::open(&dataset, &model).unwrap();
    assert_eq!(reopened.version(), 1);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn reload_bumps_version_and_keeps_old_snapshots() {
    let dir = temp_dir("reload");
    let dataset = dir.join("dataset.json");
    let model = dir.join("model.json");
    let store = ModelStore::open(&dataset, &model).unwrap();
    let before = store.active();

    assert_eq!(store.reload().unwrap(), 2);
    assert_eq!(store.version(), 2);
    assert_eq!(before.version(), 1);
    assert_eq!(before.predict("clear").version, 1);
    assert_eq!(ClassifierModel::load(&model).unwrap().version(), 2);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn failed_reload_keeps_model_version() {
    let dir = temp_dir("reload_fail");
    let dataset = dir.join("dataset.json");
    let model = dir.join("model.json");
    let store = ModelStore::open(&dataset, &model).unwrap();

    fs::write(&dataset, "not json").unwrap();
    assert!(store.reload().is_err());
    assert_eq!(store.version(), 1);

    fs::write(&dataset, "[]").unwrap();
    assert!(store.reload().is_err());

    fs::write(&dataset, r#"[{"text": "hi", "label": "wave"}]"#).unwrap();
    let err = store.reload().unwrap_err();
    assert_eq!(err.reason(), "classifier-load-failure");

    fs::remove_file(&dataset).unwrap();
    assert!(store.reload().is_err());
    assert_eq!(store.version(), 1);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn reload_without_dataset_fails() {
    let store = ModelStore::from_model(shared_store().active().as_ref().clone());
    assert!(store.reload().is_err());
    assert!(store.add_sample("wipe", IntentLabel::Clear).is_err());
}

#[test]
fn added_samples_persist_to_dataset() {
    let dir = temp_dir("samples");
    let dataset = dir.join("dataset.json");
    let model = dir.join("model.json");
    let store = ModelStore::open(&dataset, &model).unwrap();
    let base = default_dataset().len();

    assert_eq!(store.add_sample("nuke it", IntentLabel::Clear).unwrap(), base + 1);
    assert_eq!(store.add_sample("NUKE IT", IntentLabel::Clear).unwrap(), base + 1);
    let samples = load_dataset(&dataset).unwrap();
    assert!(samples
        .iter()
        .any(|s| s.text == "nuke it" && s.label == IntentLabel::Clear));
    let _ = fs::remove_dir_all(&dir);
}
