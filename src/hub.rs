//! Fan-out of voice events to stream subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::lock::lock_or_recover;
use crate::protocol::VoiceEvent;

pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 20;

pub type SubscriberId = u64;

/// Item yielded by a [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Event(VoiceEvent),
    Heartbeat,
}

struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<VoiceEvent>,
}

struct HubInner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    heartbeat: Duration,
}

impl HubInner {
    fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = lock_or_recover(&self.subscribers, "hub unsubscribe");
        let before = subscribers.len();
        subscribers.retain(|sub| sub.id != id);
        subscribers.len() != before
    }
}

/// Broadcasts events to every live subscriber.
///
/// Publishing never blocks: each subscriber has its own bounded queue and a
/// subscriber whose queue is full or closed is dropped from the registry.
/// Publication holds the registry lock, so all subscribers see events in the
/// same order.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new(capacity: usize, heartbeat: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                heartbeat,
            }),
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.inner.heartbeat
    }

    pub fn subscriber_count(&self) -> usize {
        lock_or_recover(&self.inner.subscribers, "hub count").len()
    }

    /// Deliver `event` to every subscriber. Returns how many accepted it.
    pub fn publish(&self, event: VoiceEvent) -> usize {
        let mut subscribers = lock_or_recover(&self.inner.subscribers, "hub publish");
        let mut delivered = 0;
        subscribers.retain(|sub| match sub.sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = sub.id, "dropping slow stream subscriber");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = sub.id, "stream subscriber went away");
                false
            }
        });
        delivered
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        lock_or_recover(&self.inner.subscribers, "hub subscribe").push(Subscriber { id, sender });
        tracing::debug!(subscriber = id, "stream subscriber added");
        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
            heartbeat: self.inner.heartbeat,
            ticker: None,
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove(id)
    }
}

/// One subscriber's view of the hub. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<VoiceEvent>,
    hub: Weak<HubInner>,
    heartbeat: Duration,
    ticker: Option<Interval>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or a heartbeat after `heartbeat` of silence. `None` once
    /// the hub has dropped this subscriber and its queue is drained.
    pub async fn next(&mut self) -> Option<HubMessage> {
        let period = self.heartbeat;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        tokio::select! {
            biased;
            event = self.receiver.recv() => {
                ticker.reset();
                event.map(HubMessage::Event)
            }
            _ = ticker.tick() => Some(HubMessage::Heartbeat),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            if hub.remove(self.id) {
                tracing::debug!(subscriber = self.id, "stream subscriber removed");
            }
        }
    }
}
