use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use sim_types::{MetricsSnapshot, NodeId};

/// Atomic counters backing `SimulationEngine::metrics()`. All mutators are
/// safe under concurrent invocation.
pub struct MetricsAggregator {
    simulated_time: AtomicU64,
    message_count: AtomicU64,
    rounds: AtomicU64,
    converged: AtomicBool,
    leader_id: RwLock<Option<NodeId>>,
    start_time: RwLock<Option<Instant>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            simulated_time: AtomicU64::new(0),
            message_count: AtomicU64::new(0),
            rounds: AtomicU64::new(0),
            converged: AtomicBool::new(false),
            leader_id: RwLock::new(None),
            start_time: RwLock::new(None),
        }
    }

    /// Records the wall-clock base and zeroes counters.
    pub fn start(&self) {
        *self.start_time.write() = Some(Instant::now());
        self.simulated_time.store(0, Ordering::SeqCst);
        self.message_count.store(0, Ordering::SeqCst);
        self.rounds.store(0, Ordering::SeqCst);
        self.converged.store(false, Ordering::SeqCst);
        *self.leader_id.write() = None;
    }

    pub fn increment_message_count(&self) {
        self.message_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn advance(&self, steps: u64) {
        self.rounds.fetch_add(steps, Ordering::SeqCst);
        self.simulated_time.fetch_add(steps, Ordering::SeqCst);
    }

    pub fn set_leader(&self, id: Option<NodeId>) {
        *self.leader_id.write() = id;
    }

    pub fn set_converged(&self, converged: bool) {
        self.converged.store(converged, Ordering::SeqCst);
    }

    pub fn leader(&self) -> Option<NodeId> {
        self.leader_id.read().clone()
    }

    pub fn converged(&self) -> bool {
        self.converged.load(Ordering::SeqCst)
    }

    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let real_time_millis = self
            .start_time
            .read()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        MetricsSnapshot {
            simulated_time: self.simulated_time.load(Ordering::SeqCst),
            real_time_millis,
            message_count: self.message_count.load(Ordering::SeqCst),
            rounds: self.rounds(),
            converged: self.converged(),
            leader_id: self.leader().map(|id| id.value().to_string()),
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
