use crossbeam_channel::{bounded, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use super::source::SpeechSource;
use crate::error::VoiceError;
use crate::hub::EventHub;
use crate::intent::IntentClassifier;
use crate::lock::lock_or_recover;
use crate::protocol::{StatusLevel, StreamState, VoiceEvent};
use crate::trigger::{TriggerEngine, TriggerSettings};

pub const DEFAULT_SEGMENT_CAPACITY: usize = 32;
pub const DEFAULT_TICK_MS: u64 = 100;

/// Lifecycle of the single voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Listening,
    Error,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Stopped => "idle",
            SessionState::Starting => "calibrating",
            SessionState::Listening => "listening",
            SessionState::Error => "error",
        }
    }

    pub fn stream_state(self) -> StreamState {
        match self {
            SessionState::Stopped => StreamState::Idle,
            SessionState::Starting => StreamState::Calibrating,
            SessionState::Listening => StreamState::Listening,
            SessionState::Error => StreamState::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub segment_capacity: usize,
    /// How often the worker checks the buffer for a debounced partial.
    pub tick: Duration,
    pub trigger: TriggerSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            trigger: TriggerSettings::default(),
        }
    }
}

/// Handle to the running ingestion worker.
struct Worker {
    generation: u64,
    sender: Sender<String>,
    stop_flag: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

struct Slot {
    state: SessionState,
    generation: u64,
    worker: Option<Worker>,
}

struct SessionInner {
    source: Arc<dyn SpeechSource>,
    classifier: IntentClassifier,
    hub: EventHub,
    settings: SessionSettings,
    slot: Mutex<Slot>,
}

impl SessionInner {
    fn publish_status(&self, state: SessionState, message: &str) {
        self.hub.publish(VoiceEvent::status(
            state.stream_state(),
            message,
            StatusLevel::Info,
        ));
    }

    /// Called by the worker after it heard a stop command. The worker exits
    /// on its own, so its handle is detached instead of joined.
    fn finish_from_worker(&self, generation: u64) {
        let mut slot = lock_or_recover(&self.slot, "session finish");
        let owns_slot = slot
            .worker
            .as_ref()
            .is_some_and(|worker| worker.generation == generation);
        if !owns_slot {
            return;
        }
        slot.worker = None;
        slot.state = SessionState::Stopped;
        self.source.release();
        self.publish_status(SessionState::Stopped, "Voice capture stopped");
        tracing::info!("voice session stopped by voice command");
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let slot = lock_or_recover(&self.slot, "session drop");
        if let Some(worker) = slot.worker.as_ref() {
            worker.request_stop();
        }
    }
}

/// Owns the capture session and its ingestion worker thread.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(
        source: Arc<dyn SpeechSource>,
        classifier: IntentClassifier,
        hub: EventHub,
        settings: SessionSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                source,
                classifier,
                hub,
                settings,
                slot: Mutex::new(Slot {
                    state: SessionState::Stopped,
                    generation: 0,
                    worker: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        lock_or_recover(&self.inner.slot, "session state").state
    }

    pub fn source_name(&self) -> String {
        self.inner.source.name()
    }

    pub fn source_available(&self) -> Result<(), VoiceError> {
        self.inner.source.probe()
    }

    /// Acquire the speech source and spawn the ingestion worker.
    ///
    /// Starting while listening only reports that capture is already running.
    /// Acquisition failure moves the session to `Error` and is not retried.
    pub fn start(&self) -> Result<SessionState, VoiceError> {
        let inner = &self.inner;
        let mut slot = lock_or_recover(&inner.slot, "session start");
        if slot.state == SessionState::Listening && slot.worker.is_some() {
            inner.publish_status(SessionState::Listening, "Voice capture already running");
            return Ok(SessionState::Listening);
        }

        slot.state = SessionState::Starting;
        inner.publish_status(SessionState::Starting, "Acquiring speech source");
        if let Err(err) = inner.source.acquire() {
            slot.state = SessionState::Error;
            tracing::warn!("voice session failed to start: {err}");
            inner.hub.publish(VoiceEvent::status(
                StreamState::Error,
                err.to_string(),
                StatusLevel::Info,
            ));
            return Err(err);
        }

        slot.generation += 1;
        let worker = spawn_worker(inner, slot.generation);
        slot.worker = Some(worker);
        slot.state = SessionState::Listening;
        inner.publish_status(SessionState::Listening, "Listening for commands");
        tracing::info!(source = %inner.source.name(), "voice session listening");
        Ok(SessionState::Listening)
    }

    /// Stop the worker and release the source. Safe to call at any time.
    pub fn stop(&self) -> SessionState {
        let inner = &self.inner;
        let worker = {
            let mut slot = lock_or_recover(&inner.slot, "session stop");
            slot.state = SessionState::Stopped;
            slot.worker.take()
        };

        let Some(worker) = worker else {
            inner.publish_status(SessionState::Stopped, "Voice capture idle");
            return SessionState::Stopped;
        };

        inner.publish_status(SessionState::Stopped, "Stopping voice capture");
        worker.request_stop();
        let Worker { sender, handle, .. } = worker;
        drop(sender);
        if handle.join().is_err() {
            tracing::warn!("ingestion worker panicked");
        }
        inner.source.release();
        inner.publish_status(SessionState::Stopped, "Voice capture stopped");
        tracing::info!("voice session stopped");
        SessionState::Stopped
    }

    /// Ingestion entry point for the speech engine.
    pub fn submit_segment(&self, text: &str) -> Result<(), VoiceError> {
        let slot = lock_or_recover(&self.inner.slot, "session submit");
        let worker = match (&slot.state, slot.worker.as_ref()) {
            (SessionState::Listening, Some(worker)) => worker,
            _ => return Err(VoiceError::SessionNotListening),
        };
        match worker.sender.try_send(text.to_string()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!("segment queue full; dropping transcript segment");
                Err(VoiceError::SegmentQueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(VoiceError::SessionNotListening),
        }
    }
}

fn spawn_worker(inner: &Arc<SessionInner>, generation: u64) -> Worker {
    let (sender, receiver) = bounded::<String>(inner.settings.segment_capacity.max(1));
    let stop_flag = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop_flag);
    let session: Weak<SessionInner> = Arc::downgrade(inner);
    let hub = inner.hub.clone();
    let tick = inner.settings.tick;
    let mut engine = TriggerEngine::new(inner.classifier.clone(), inner.settings.trigger);

    let handle = thread::spawn(move || {
        loop {
            if worker_stop.load(Ordering::Relaxed) {
                break;
            }
            let mut flush = match receiver.recv_timeout(tick) {
                Ok(segment) => engine.ingest(&segment, Instant::now()),
                Err(RecvTimeoutError::Timeout) => engine.tick(Instant::now()),
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if !flush.stop_requested {
                let partial = engine.tick(Instant::now());
                flush.stop_requested = partial.stop_requested;
                flush.events.extend(partial.events);
            }
            for event in flush.events {
                hub.publish(event);
            }
            if flush.stop_requested {
                worker_stop.store(true, Ordering::Relaxed);
                if let Some(inner) = session.upgrade() {
                    inner.finish_from_worker(generation);
                }
                break;
            }
        }
        tracing::debug!(generation, "ingestion worker exiting");
    });

    Worker {
        generation,
        sender,
        stop_flag,
        handle,
    }
}
