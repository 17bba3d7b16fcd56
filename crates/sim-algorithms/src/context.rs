use std::collections::BTreeSet;

use sim_types::{Message, NodeId};

/// View presented to an algorithm: own id, immutable neighbor set, and the
/// only two ways to reach the outside world. Hides the transport entirely
/// so algorithms never see wire formats.
pub trait NodeContext {
    fn self_id(&self) -> &NodeId;
    fn neighbors(&self) -> &BTreeSet<NodeId>;
    fn send(&mut self, target: &NodeId, message: Message);
    fn broadcast(&mut self, targets: &[NodeId], message: Message);
}

/// Explicit state-inspection capability an algorithm may expose, in place
/// of reflecting into its private fields. The engine's convergence pass
/// reads `current_leader`; algorithms with no notion of leadership simply
/// never override `NodeAlgorithm::snapshot_state`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlgorithmSnapshot {
    pub current_leader: Option<NodeId>,
}
