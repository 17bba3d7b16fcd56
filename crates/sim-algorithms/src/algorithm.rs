use sim_types::Message;

use crate::context::{AlgorithmSnapshot, NodeContext};

/// Pluggable per-node behaviour. Implementations own no transport state of
/// their own; everything observable or sendable goes through `NodeContext`.
pub trait NodeAlgorithm: Send {
    /// Called exactly once, before any `on_message`.
    fn on_start(&mut self, ctx: &mut dyn NodeContext);

    /// Called for every message delivered to the owning node after start.
    fn on_message(&mut self, ctx: &mut dyn NodeContext, message: &Message);

    /// Optional capability replacing reflection-based state inspection.
    fn snapshot_state(&self) -> Option<AlgorithmSnapshot> {
        None
    }
}
