use sim_types::{Message, NodeId};

use crate::algorithm::NodeAlgorithm;
use crate::context::{AlgorithmSnapshot, NodeContext};

const LEADER_ANNOUNCEMENT: &str = "LEADER_ANNOUNCEMENT";

/// Reference algorithm: floods leader announcements until every node agrees
/// on the maximum `NodeId` in the network.
pub struct FloodingLeaderElectionAlgorithm {
    current_leader: Option<NodeId>,
    converged: bool,
}

impl FloodingLeaderElectionAlgorithm {
    pub fn new() -> Self {
        Self {
            current_leader: None,
            converged: false,
        }
    }
}

impl Default for FloodingLeaderElectionAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeAlgorithm for FloodingLeaderElectionAlgorithm {
    fn on_start(&mut self, ctx: &mut dyn NodeContext) {
        let own_id = ctx.self_id().clone();
        self.current_leader = Some(own_id.clone());

        let announcement = serde_json::Value::String(own_id.value().to_string());
        let neighbors: Vec<NodeId> = ctx.neighbors().iter().cloned().collect();
        for neighbor in &neighbors {
            let msg = Message::new(own_id.clone(), neighbor.clone(), LEADER_ANNOUNCEMENT, announcement.clone());
            ctx.send(neighbor, msg);
        }
    }

    fn on_message(&mut self, ctx: &mut dyn NodeContext, message: &Message) {
        if message.message_type != LEADER_ANNOUNCEMENT {
            return;
        }
        let Some(payload) = message.payload.as_str() else {
            return;
        };
        let Ok(announced) = NodeId::new(payload) else {
            return;
        };

        let should_adopt = match &self.current_leader {
            Some(current) => &announced > current,
            None => true,
        };
        if !should_adopt {
            return;
        }

        self.current_leader = Some(announced.clone());
        self.converged = false;

        let own_id = ctx.self_id().clone();
        let announcement = serde_json::Value::String(announced.value().to_string());
        let neighbors: Vec<NodeId> = ctx.neighbors().iter().cloned().collect();
        for neighbor in &neighbors {
            let msg = Message::new(own_id.clone(), neighbor.clone(), LEADER_ANNOUNCEMENT, announcement.clone());
            ctx.send(neighbor, msg);
        }
    }

    fn snapshot_state(&self) -> Option<AlgorithmSnapshot> {
        Some(AlgorithmSnapshot {
            current_leader: self.current_leader.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct RecordingContext {
        self_id: NodeId,
        neighbors: BTreeSet<NodeId>,
        sent: Vec<(NodeId, Message)>,
    }

    impl NodeContext for RecordingContext {
        fn self_id(&self) -> &NodeId {
            &self.self_id
        }

        fn neighbors(&self) -> &BTreeSet<NodeId> {
            &self.neighbors
        }

        fn send(&mut self, target: &NodeId, message: Message) {
            self.sent.push((target.clone(), message));
        }

        fn broadcast(&mut self, targets: &[NodeId], message: Message) {
            for target in targets {
                self.send(target, message.clone());
            }
        }
    }

    #[test]
    fn on_start_announces_self_to_every_neighbor() {
        let mut ctx = RecordingContext {
            self_id: NodeId::new("1").unwrap(),
            neighbors: BTreeSet::from([NodeId::new("0").unwrap(), NodeId::new("2").unwrap()]),
            sent: Vec::new(),
        };
        let mut algo = FloodingLeaderElectionAlgorithm::new();
        algo.on_start(&mut ctx);

        assert_eq!(ctx.sent.len(), 2);
        assert_eq!(
            algo.snapshot_state().unwrap().current_leader,
            Some(NodeId::new("1").unwrap())
        );
    }

    #[test]
    fn adopts_higher_announcement_and_rebroadcasts() {
        let mut ctx = RecordingContext {
            self_id: NodeId::new("1").unwrap(),
            neighbors: BTreeSet::from([NodeId::new("0").unwrap(), NodeId::new("2").unwrap()]),
            sent: Vec::new(),
        };
        let mut algo = FloodingLeaderElectionAlgorithm::new();
        algo.on_start(&mut ctx);
        ctx.sent.clear();

        let msg = Message::new(
            NodeId::new("2").unwrap(),
            NodeId::new("1").unwrap(),
            LEADER_ANNOUNCEMENT,
            serde_json::Value::String("2".to_string()),
        );
        algo.on_message(&mut ctx, &msg);

        assert_eq!(
            algo.snapshot_state().unwrap().current_leader,
            Some(NodeId::new("2").unwrap())
        );
        assert_eq!(ctx.sent.len(), 2);
    }

    #[test]
    fn ignores_lower_announcement() {
        let mut ctx = RecordingContext {
            self_id: NodeId::new("2").unwrap(),
            neighbors: BTreeSet::from([NodeId::new("1").unwrap()]),
            sent: Vec::new(),
        };
        let mut algo = FloodingLeaderElectionAlgorithm::new();
        algo.on_start(&mut ctx);
        ctx.sent.clear();

        let msg = Message::new(
            NodeId::new("1").unwrap(),
            NodeId::new("2").unwrap(),
            LEADER_ANNOUNCEMENT,
            serde_json::Value::String("1".to_string()),
        );
        algo.on_message(&mut ctx, &msg);

        assert!(ctx.sent.is_empty());
        assert_eq!(
            algo.snapshot_state().unwrap().current_leader,
            Some(NodeId::new("2").unwrap())
        );
    }

    #[test]
    fn ignores_non_announcement_messages() {
        let mut ctx = RecordingContext {
            self_id: NodeId::new("0").unwrap(),
            neighbors: BTreeSet::new(),
            sent: Vec::new(),
        };
        let mut algo = FloodingLeaderElectionAlgorithm::new();
        algo.on_start(&mut ctx);

        let msg = Message::new(
            NodeId::new("1").unwrap(),
            NodeId::new("0").unwrap(),
            "PING",
            serde_json::Value::Null,
        );
        algo.on_message(&mut ctx, &msg);
        assert_eq!(
            algo.snapshot_state().unwrap().current_leader,
            Some(NodeId::new("0").unwrap())
        );
    }
}
