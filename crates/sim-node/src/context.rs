use std::collections::BTreeSet;
use std::sync::Arc;

use sim_algorithms::NodeContext;
use sim_transport::MessagingPort;
use sim_types::{Message, NodeId};

/// Concrete `NodeContext` bridging an algorithm to the underlying
/// `MessagingPort`, grounded on the simulator's scoped-context-over-a-port
/// pattern and generalized from two fixed peers to an arbitrary neighbor set.
pub struct PortContext {
    self_id: NodeId,
    neighbors: BTreeSet<NodeId>,
    port: Arc<dyn MessagingPort>,
    on_message_sent: Arc<dyn Fn() + Send + Sync>,
}

impl PortContext {
    pub fn new(
        self_id: NodeId,
        neighbors: BTreeSet<NodeId>,
        port: Arc<dyn MessagingPort>,
        on_message_sent: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            self_id,
            neighbors,
            port,
            on_message_sent,
        }
    }
}

impl NodeContext for PortContext {
    fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    fn neighbors(&self) -> &BTreeSet<NodeId> {
        &self.neighbors
    }

    fn send(&mut self, target: &NodeId, message: Message) {
        self.port.send(target, message);
        (self.on_message_sent)();
    }

    fn broadcast(&mut self, targets: &[NodeId], message: Message) {
        for target in targets {
            self.send(target, message.clone());
        }
    }
}
