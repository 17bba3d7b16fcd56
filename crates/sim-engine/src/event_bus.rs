use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use sim_types::{Event, EventKind};

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Per-session publisher/subscriber, keyed by `EventKind`.
///
/// Delivery is synchronous relative to the publisher. Listener panics are
/// caught and logged (never propagated to the publisher); the subscriber
/// list snapshot taken for a publish is stable even if subscribe/unsubscribe
/// runs concurrently with that publish.
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<(u64, Listener)>>>,
    next_id: AtomicU64,
}

/// Opaque handle returned by `subscribe`, used to `unsubscribe` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, kind: EventKind, listener: Listener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, listener));
        SubscriptionId(id)
    }

    /// Subscribes to every event kind, the shape `registerVisualizationListener` needs.
    pub fn subscribe_all(&self, listener: Listener) -> Vec<SubscriptionId> {
        EventKind::ALL
            .iter()
            .map(|kind| self.subscribe(*kind, listener.clone()))
            .collect()
    }

    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) {
        if let Some(list) = self.listeners.write().get_mut(&kind) {
            list.retain(|(existing, _)| *existing != id.0);
        }
    }

    pub fn publish(&self, event: Event) {
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.read();
            listeners
                .get(&event.kind)
                .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default()
        };

        for listener in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(&event)));
            if outcome.is_err() {
                tracing::error!(kind = event.kind.as_str(), "event listener panicked");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
