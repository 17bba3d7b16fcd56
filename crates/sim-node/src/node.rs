use std::collections::BTreeSet;
use std::sync::Arc;

use sim_algorithms::{AlgorithmSnapshot, NodeAlgorithm};
use sim_transport::MessagingPort;
use sim_types::{Message, NodeId, SimError};

use crate::context::PortContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unstarted,
    MarkedReady,
    Initialized,
}

/// Per-node lifecycle wrapper: buffers messages before start, dispatches to
/// the algorithm after. States: UNSTARTED -> MARKED_READY -> INITIALIZED.
///
/// `on_start` may itself send messages, and the in-process port delivers
/// synchronously, so peers must already be reachable: the engine marks
/// every node ready before calling `on_start` on any of them.
pub struct SimulationNode {
    node_id: NodeId,
    state: NodeState,
    algorithm: Box<dyn NodeAlgorithm>,
    context: PortContext,
    buffered: Vec<Message>,
}

impl SimulationNode {
    pub fn new(
        node_id: NodeId,
        neighbors: BTreeSet<NodeId>,
        algorithm: Box<dyn NodeAlgorithm>,
        port: Arc<dyn MessagingPort>,
        on_message_sent: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        let context = PortContext::new(node_id.clone(), neighbors, port, on_message_sent);
        Self {
            node_id,
            state: NodeState::Unstarted,
            algorithm,
            context,
            buffered: Vec::new(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn neighbors(&self) -> &BTreeSet<NodeId> {
        self.context.neighbors()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Transitions UNSTARTED -> MARKED_READY. Called by the engine on every
    /// node before any `on_start`.
    pub fn mark_ready(&mut self) -> Result<(), SimError> {
        match self.state {
            NodeState::Unstarted => {
                self.state = NodeState::MarkedReady;
                Ok(())
            }
            _ => Err(SimError::IllegalState(format!(
                "node {} is not UNSTARTED",
                self.node_id
            ))),
        }
    }

    /// Runs `algorithm.on_start`, then drains buffered messages in FIFO
    /// order. Must be called at most once.
    pub fn on_start(&mut self) -> Result<(), SimError> {
        if self.state != NodeState::MarkedReady {
            return Err(SimError::IllegalState(format!(
                "node {} requires MARKED_READY to start, is {:?}",
                self.node_id, self.state
            )));
        }
        self.algorithm.on_start(&mut self.context);
        self.state = NodeState::Initialized;

        let buffered = std::mem::take(&mut self.buffered);
        for message in buffered {
            self.algorithm.on_message(&mut self.context, &message);
        }
        Ok(())
    }

    /// Requires at least MARKED_READY. Dispatches immediately if
    /// INITIALIZED, otherwise buffers in arrival order.
    pub fn on_message(&mut self, message: Message) -> Result<(), SimError> {
        match self.state {
            NodeState::Initialized => {
                self.algorithm.on_message(&mut self.context, &message);
                Ok(())
            }
            NodeState::Unstarted | NodeState::MarkedReady => {
                self.buffered.push(message);
                Ok(())
            }
        }
    }

    pub fn snapshot_state(&self) -> Option<AlgorithmSnapshot> {
        self.algorithm.snapshot_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_algorithms::FloodingLeaderElectionAlgorithm;
    use sim_transport::InProcessMessagingPort;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn new_port() -> Arc<dyn MessagingPort> {
        Arc::new(InProcessMessagingPort::new(Arc::new(|_, _| {})))
    }

    fn new_node(id: &str, neighbors: BTreeSet<NodeId>) -> (SimulationNode, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = counter.clone();
        let node = SimulationNode::new(
            NodeId::new(id).unwrap(),
            neighbors,
            Box::new(FloodingLeaderElectionAlgorithm::new()),
            new_port(),
            Arc::new(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (node, counter)
    }

    #[test]
    fn messages_before_start_are_buffered_then_drained_in_order() {
        let (mut node, _) = new_node("1", BTreeSet::from([NodeId::new("0").unwrap()]));
        node.mark_ready().unwrap();

        let m1 = Message::new(
            NodeId::new("0").unwrap(),
            NodeId::new("1").unwrap(),
            "LEADER_ANNOUNCEMENT",
            serde_json::Value::String("0".to_string()),
        );
        node.on_message(m1).unwrap();
        assert_eq!(node.state(), NodeState::MarkedReady);

        node.on_start().unwrap();
        assert_eq!(node.state(), NodeState::Initialized);
        // own id "1" beats buffered announcement "0", so leader stays "1"
        assert_eq!(
            node.snapshot_state().unwrap().current_leader,
            Some(NodeId::new("1").unwrap())
        );
    }

    #[test]
    fn on_start_requires_marked_ready() {
        let (mut node, _) = new_node("0", BTreeSet::new());
        assert!(node.on_start().is_err());
    }

    #[test]
    fn duplicate_on_start_fails() {
        let (mut node, _) = new_node("0", BTreeSet::new());
        node.mark_ready().unwrap();
        node.on_start().unwrap();
        assert!(node.on_start().is_err());
    }

    #[test]
    fn sending_increments_counter_once_per_target() {
        let (mut node, counter) = new_node(
            "1",
            BTreeSet::from([NodeId::new("0").unwrap(), NodeId::new("2").unwrap()]),
        );
        node.mark_ready().unwrap();
        node.on_start().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
