use super::*;
use crate::error::VoiceError;
use crate::hub::{EventHub, HubMessage, Subscription};
use crate::intent::{default_dataset, IntentClassifier, ModelStore};
use crate::protocol::{Action, StreamState, VoiceEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

fn classifier() -> IntentClassifier {
    static STORE: OnceLock<Arc<ModelStore>> = OnceLock::new();
    let store = STORE
        .get_or_init(|| Arc::new(ModelStore::from_samples(default_dataset()).unwrap()))
        .clone();
    IntentClassifier::new(store)
}

#[derive(Default)]
struct CountingSource {
    fail: bool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl SpeechSource for CountingSource {
    fn name(&self) -> String {
        "counting".to_string()
    }

    fn probe(&self) -> Result<(), VoiceError> {
        if self.fail {
            Err(VoiceError::ResourceUnavailable("no microphone".to_string()))
        } else {
            Ok(())
        }
    }

    fn acquire(&self) -> Result<(), VoiceError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.probe()
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn manager(source: Arc<CountingSource>) -> (SessionManager, EventHub) {
    let hub = EventHub::new(64, Duration::from_secs(60));
    let settings = SessionSettings {
        tick: Duration::from_millis(10),
        ..SessionSettings::default()
    };
    let manager = SessionManager::new(source, classifier(), hub.clone(), settings);
    (manager, hub)
}

async fn next_event(sub: &mut Subscription) -> VoiceEvent {
    let message = tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .expect("event before timeout");
    match message {
        Some(HubMessage::Event(event)) => event,
        other => panic!("expected event, got {other:?}"),
    }
}

async fn next_result(sub: &mut Subscription) -> VoiceEvent {
    loop {
        let event = next_event(sub).await;
        if event.action().is_some() {
            return event;
        }
    }
}

fn status_state(event: &VoiceEvent) -> Option<StreamState> {
    match event {
        VoiceEvent::Status(status) => Some(status.state),
        VoiceEvent::Result(_) => None,
    }
}

#[test]
fn start_and_stop_transitions() {
    let source = Arc::new(CountingSource::default());
    let (manager, _hub) = manager(source.clone());
    assert_eq!(manager.state(), SessionState::Stopped);
    assert_eq!(manager.start().unwrap(), SessionState::Listening);
    assert_eq!(manager.state(), SessionState::Listening);

    assert_eq!(manager.stop(), SessionState::Stopped);
    assert_eq!(manager.stop(), SessionState::Stopped);
    assert_eq!(source.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(source.released.load(Ordering::SeqCst), 1);
}

#[test]
fn second_start_acquires_nothing() {
    let source = Arc::new(CountingSource::default());
    let (manager, hub) = manager(source.clone());
    manager.start().unwrap();
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(manager.start().unwrap(), SessionState::Listening);
    assert_eq!(source.acquired.load(Ordering::SeqCst), 1);
    manager.stop();
}

#[tokio::test]
async fn acquisition_failure_reports_error_status() {
    let source = Arc::new(CountingSource {
        fail: true,
        ..CountingSource::default()
    });
    let (manager, hub) = manager(source.clone());
    let mut sub = hub.subscribe();

    let err = manager.start().unwrap_err();
    assert_eq!(err.reason(), "resource-unavailable");
    assert_eq!(manager.state(), SessionState::Error);
    assert_eq!(source.acquired.load(Ordering::SeqCst), 1);

    assert_eq!(status_state(&next_event(&mut sub).await), Some(StreamState::Calibrating));
    assert_eq!(status_state(&next_event(&mut sub).await), Some(StreamState::Error));
    assert!(manager.submit_segment("three").is_err());
}

#[test]
fn segments_rejected_when_not_listening() {
    let (manager, _hub) = manager(Arc::new(CountingSource::default()));
    assert_eq!(
        manager.submit_segment("three plus four"),
        Err(VoiceError::SessionNotListening)
    );
}

#[tokio::test]
async fn segments_flow_to_subscribers() {
    let (manager, hub) = manager(Arc::new(CountingSource::default()));
    let mut sub = hub.subscribe();
    manager.start().unwrap();

    manager.submit_segment("three plus four is equal to").unwrap();
    let first = next_result(&mut sub).await;
    let second = next_result(&mut sub).await;
    assert_eq!(first.action(), Some(Action::AppendExpression));
    assert_eq!(second.action(), Some(Action::Calculate));
    manager.stop();
}

#[tokio::test]
async fn stop_phrase_stops_the_session() {
    let source = Arc::new(CountingSource::default());
    let (manager, hub) = manager(source.clone());
    let mut sub = hub.subscribe();
    manager.start().unwrap();

    manager.submit_segment("mic off").unwrap();
    assert_eq!(next_result(&mut sub).await.action(), Some(Action::Stop));
    loop {
        let event = next_event(&mut sub).await;
        if status_state(&event) == Some(StreamState::Idle) {
            break;
        }
    }
    assert_eq!(manager.state(), SessionState::Stopped);
    assert_eq!(source.released.load(Ordering::SeqCst), 1);
    assert_eq!(
        manager.submit_segment("one"),
        Err(VoiceError::SessionNotListening)
    );

    assert_eq!(manager.start().unwrap(), SessionState::Listening);
    manager.stop();
}

#[test]
fn full_queue_rejects_segments() {
    let hub = EventHub::new(4, Duration::from_secs(60));
    let settings = SessionSettings {
        segment_capacity: 1,
        tick: Duration::from_secs(60),
        ..SessionSettings::default()
    };
    let manager = SessionManager::new(
        Arc::new(CountingSource::default()),
        classifier(),
        hub,
        settings,
    );
    manager.start().unwrap();
    // Each segment carries many calculate triggers so the worker falls behind.
    let heavy = "nine times four equals ".repeat(50);
    let mut outcomes = Vec::new();
    for _ in 0..200 {
        outcomes.push(manager.submit_segment(&heavy));
    }
    assert!(outcomes.contains(&Err(VoiceError::SegmentQueueFull)));
    manager.stop();
}

#[test]
fn unavailable_source_never_acquires() {
    let source = UnavailableSource::new("built without microphone support");
    assert!(source.probe().is_err());
    assert!(source.acquire().is_err());
    assert!(ExternalFeed.probe().is_ok());
}
