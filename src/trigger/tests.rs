use super::*;
use crate::intent::{default_dataset, IntentClassifier, ModelStore};
use crate::protocol::{Action, VoiceEvent};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

fn classifier() -> IntentClassifier {
    static STORE: OnceLock<Arc<ModelStore>> = OnceLock::new();
    let store = STORE
        .get_or_init(|| Arc::new(ModelStore::from_samples(default_dataset()).unwrap()))
        .clone();
    IntentClassifier::new(store)
}

fn engine() -> TriggerEngine {
    TriggerEngine::new(classifier(), TriggerSettings::default())
}

fn results(flush: &Flush) -> Vec<(Action, Option<String>)> {
    flush
        .events
        .iter()
        .filter_map(|event| match event {
            VoiceEvent::Result(result) => Some((result.action, result.expression.clone())),
            VoiceEvent::Status(_) => None,
        })
        .collect()
}

#[test]
fn equal_to_appends_then_calculates_once() {
    let mut engine = engine();
    let flush = engine.ingest("three plus four is equal to", Instant::now());
    assert_eq!(
        results(&flush),
        vec![
            (Action::AppendExpression, Some("3+4".to_string())),
            (Action::Calculate, Some("3+4".to_string())),
        ]
    );
    assert_eq!(engine.buffer_text(), "");
    assert!(!flush.stop_requested);
}

#[test]
fn calculate_trigger_across_segments() {
    let mut engine = engine();
    let now = Instant::now();
    assert!(results(&engine.ingest("twelve times", now)).is_empty());
    assert!(results(&engine.ingest("nine", now)).is_empty());
    let flush = engine.ingest("equals", now);
    assert_eq!(
        results(&flush),
        vec![
            (Action::AppendExpression, Some("12*9".to_string())),
            (Action::Calculate, Some("12*9".to_string())),
        ]
    );
    assert_eq!(engine.buffer_text(), "");
}

#[test]
fn bare_calculate_has_null_expression() {
    let mut engine = engine();
    let flush = engine.ingest("show result", Instant::now());
    assert_eq!(results(&flush), vec![(Action::Calculate, None)]);
}

#[test]
fn one_calculate_per_trigger_occurrence() {
    let mut engine = engine();
    let flush = engine.ingest("two plus two equals five times three equals", Instant::now());
    let calculates = results(&flush)
        .into_iter()
        .filter(|(action, _)| *action == Action::Calculate)
        .count();
    assert_eq!(calculates, 2);
    assert_eq!(engine.buffer_text(), "");
}

#[test]
fn clear_empties_buffer_with_null_expression() {
    let mut engine = engine();
    let now = Instant::now();
    engine.ingest("twelve times", now);
    assert_eq!(engine.buffer_text(), "twelve times");

    let flush = engine.ingest("clear", now);
    assert_eq!(results(&flush), vec![(Action::Clear, None)]);
    assert_eq!(engine.buffer_text(), "");
}

#[test]
fn clear_empties_buffer_regardless_of_surrounding_text() {
    let mut engine = engine();
    let now = Instant::now();
    engine.ingest("twelve times", now);

    let flush = engine.ingest("five plus clear everything six", now);
    assert_eq!(results(&flush), vec![(Action::Clear, None)]);
    assert_eq!(engine.buffer_text(), "");

    let flush = engine.ingest("clear five plus", now);
    assert_eq!(results(&flush), vec![(Action::Clear, None)]);
    assert_eq!(engine.buffer_text(), "");

    // Nothing left over for the next partial.
    assert!(results(&engine.tick(now + Duration::from_secs(5))).is_empty());
}

#[test]
fn calculate_after_clear_in_one_segment_still_fires() {
    let mut engine = engine();
    let flush = engine.ingest("nine clear two plus two equals", Instant::now());
    assert_eq!(
        results(&flush),
        vec![
            (Action::Clear, None),
            (Action::AppendExpression, Some("2+2".to_string())),
            (Action::Calculate, Some("2+2".to_string())),
        ]
    );
    assert_eq!(engine.buffer_text(), "");
}

#[test]
fn stop_bypasses_buffer() {
    let mut engine = engine();
    let now = Instant::now();
    engine.ingest("seven plus", now);
    let flush = engine.ingest("stop listening", now);
    assert_eq!(results(&flush), vec![(Action::Stop, None)]);
    assert!(flush.stop_requested);
    assert_eq!(engine.buffer_text(), "");
}

#[test]
fn backspace_leaves_buffer_alone() {
    let mut engine = engine();
    let now = Instant::now();
    engine.ingest("forty six", now);
    let flush = engine.ingest("delete last", now);
    assert_eq!(results(&flush), vec![(Action::Backspace, None)]);
    assert_eq!(engine.buffer_text(), "forty six");
}

#[test]
fn whitespace_segments_are_ignored() {
    let mut engine = engine();
    let now = Instant::now();
    assert!(engine.ingest("   ", now).is_empty());
    assert!(engine.tick(now + Duration::from_secs(5)).is_empty());
}

#[test]
fn partial_waits_for_debounce_and_skips_repeats() {
    let mut engine = engine();
    let start = Instant::now();
    engine.ingest("three plus four", start);

    assert!(engine.tick(start + Duration::from_millis(100)).is_empty());

    let flush = engine.tick(start + Duration::from_millis(700));
    assert_eq!(
        results(&flush),
        vec![(Action::AppendExpression, Some("3+4".to_string()))]
    );
    assert_eq!(engine.buffer_text(), "three plus four");

    // Not dirty any more.
    assert!(engine.tick(start + Duration::from_millis(2000)).is_empty());

    engine.ingest("banana", start + Duration::from_millis(2100));
    assert!(results(&engine.tick(start + Duration::from_millis(3000))).is_empty());

    engine.ingest("times two", start + Duration::from_millis(3100));
    let flush = engine.tick(start + Duration::from_millis(4000));
    assert_eq!(
        results(&flush),
        vec![(Action::AppendExpression, Some("3+4*2".to_string()))]
    );
}

#[test]
fn partial_command_classification_acts_as_command() {
    let mut engine = engine();
    let start = Instant::now();
    engine.ingest("wipe it", start);
    let flush = engine.tick(start + Duration::from_secs(1));
    assert_eq!(results(&flush), vec![(Action::Clear, None)]);
    assert_eq!(engine.buffer_text(), "");
}

#[test]
fn low_confidence_results_are_preceded_by_status() {
    let settings = TriggerSettings {
        low_confidence_threshold: 1.1,
        ..TriggerSettings::default()
    };
    let mut engine = TriggerEngine::new(classifier(), settings);
    let flush = engine.ingest("three plus four equals", Instant::now());
    assert!(matches!(flush.events.first(), Some(VoiceEvent::Status(_))));
    assert_eq!(
        results(&flush),
        vec![
            (Action::AppendExpression, Some("3+4".to_string())),
            (Action::Calculate, Some("3+4".to_string())),
        ]
    );
}

#[test]
fn buffer_take_through_keeps_suffix() {
    let mut buffer = TranscriptBuffer::new();
    let now = Instant::now();
    buffer.append(" one plus ", now);
    buffer.append("two equals three", now);
    assert_eq!(buffer.text(), "one plus two equals three");
    assert!(buffer.is_dirty());
    let preceding = buffer.take_through(13, 19);
    assert_eq!(preceding, "one plus two");
    assert_eq!(buffer.text(), "three");
    buffer.clear();
    assert!(!buffer.is_dirty());
    assert!(buffer.is_empty());
}
