//! Push-based progress from the engine to whoever is watching a phase.
//!
//! The engine emits from its own threads through a [`ProgressSink`]. Values
//! land in the unbounded queue of each [`ProgressSubscription`] and are only
//! applied to shared state when the subscriber drains its queue from its own
//! task.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Diagnose,
    Execute,
}

impl Phase {
    pub fn event_name(self) -> &'static str {
        match self {
            Phase::Diagnose => "diagnose-progress",
            Phase::Execute => "execute-progress",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Diagnose => f.write_str("diagnose"),
            Phase::Execute => f.write_str("execute"),
        }
    }
}

type Subscribers = HashMap<Phase, Vec<(u64, mpsc::UnboundedSender<u8>)>>;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    subscribers: Mutex<Subscribers>,
}

impl HubInner {
    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        // The map holds plain senders, so a panic mid-update cannot leave it
        // in a state worth refusing.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of progress subscribers, one list per phase.
#[derive(Clone, Default)]
pub struct ProgressHub {
    inner: Arc<HubInner>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, phase: Phase) -> ProgressSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers()
            .entry(phase)
            .or_default()
            .push((id, tx));
        log::debug!("Subscribed #{id} to {}", phase.event_name());

        ProgressSubscription {
            id,
            phase,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    pub fn emit(&self, phase: Phase, value: u8) {
        let value = value.min(100);
        let mut subscribers = self.inner.subscribers();
        if let Some(list) = subscribers.get_mut(&phase) {
            // A receiver can only be gone if its subscription leaked past
            // teardown; forget it rather than fail the producer.
            list.retain(|(_, tx)| tx.send(value).is_ok());
        }
    }

    pub fn subscriber_count(&self, phase: Phase) -> usize {
        self.inner
            .subscribers()
            .get(&phase)
            .map_or(0, |list| list.len())
    }

    /// Producer handle bound to one phase.
    pub fn sink(&self, phase: Phase) -> ProgressSink {
        ProgressSink {
            hub: self.clone(),
            phase,
        }
    }

    fn remove(inner: &HubInner, phase: Phase, id: u64) {
        if let Some(list) = inner.subscribers().get_mut(&phase) {
            list.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

/// Thread-safe producer side handed to the engine.
#[derive(Clone)]
pub struct ProgressSink {
    hub: ProgressHub,
    phase: Phase,
}

impl ProgressSink {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn emit(&self, value: u8) {
        self.hub.emit(self.phase, value);
    }

    /// Emits `done / total` mapped onto `[start, end]`.
    pub fn emit_span(&self, start: u8, end: u8, done: usize, total: usize) {
        self.emit(span_percent(start, end, done, total));
    }
}

pub(crate) fn span_percent(start: u8, end: u8, done: usize, total: usize) -> u8 {
    let total = total.max(1);
    let width = usize::from(end.saturating_sub(start));
    let offset = done.min(total) * width / total;
    start.saturating_add(u8::try_from(offset).unwrap_or(u8::MAX)).min(end)
}

/// One active subscription. Dropping it unsubscribes.
pub struct ProgressSubscription {
    id: u64,
    phase: Phase,
    rx: mpsc::UnboundedReceiver<u8>,
    hub: std::sync::Weak<HubInner>,
}

impl ProgressSubscription {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub async fn recv(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }

    /// Everything queued so far; values are "latest wins", so callers
    /// usually only care about the last one.
    pub fn drain(&mut self) -> Vec<u8> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            ProgressHub::remove(&inner, self.phase, self.id);
            log::debug!("Unsubscribed #{} from {}", self.id, self.phase.event_name());
        }
    }
}
