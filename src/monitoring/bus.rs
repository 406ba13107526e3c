/*!
 * Event Sinks
 *
 * Commands emit events through an injected `EventSink`. `EventBus` fans
 * events out to flume subscribers, `RecordingSink` keeps them for
 * inspection, and `NullSink` drops them.
 */

use super::events::{EventRecord, KernelEvent, Severity};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Fire-and-forget event consumer
pub trait EventSink: Send + Sync {
    fn emit(&self, event: KernelEvent);
}

/// Broadcast bus; every subscriber receives every event
///
/// Cheap to clone; clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<flume::Sender<EventRecord>>>>,
    emitted: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> flume::Receiver<EventRecord> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.write().push(tx);
        debug!(subscribers = self.subscriber_count(), "Event subscriber added");
        rx
    }

    /// Publish a record, returning how many subscribers received it
    pub fn publish(&self, record: EventRecord) -> usize {
        self.emitted.fetch_add(1, Ordering::Relaxed);

        let mut sent = 0;
        let mut disconnected = false;
        for tx in self.subscribers.read().iter() {
            match tx.send(record.clone()) {
                Ok(_) => sent += 1,
                Err(_) => disconnected = true,
            }
        }

        // Clean up disconnected subscribers
        if disconnected {
            self.subscribers.write().retain(|tx| !tx.is_disconnected());
            debug!("Pruned disconnected event subscribers");
        }

        sent
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Total events published since creation
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: KernelEvent) {
        let name = event.name();
        let character = event.character_id().to_string();
        match event.severity() {
            Severity::Critical | Severity::Warn => {
                warn!(event = name, character = %character, "Kernel event")
            }
            Severity::Info => info!(event = name, character = %character, "Kernel event"),
            Severity::Debug => debug!(event = name, character = %character, "Kernel event"),
        }

        let delivered = self.publish(EventRecord::new(event));
        trace!(event = name, delivered, "Event delivered");
    }
}

/// Sink that keeps every event in memory
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<KernelEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<KernelEvent> {
        self.events.lock().clone()
    }

    /// Event names in emission order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: KernelEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: KernelEvent) {}
}
