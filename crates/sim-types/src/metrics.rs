use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub simulated_time: u64,
    pub real_time_millis: u64,
    pub message_count: u64,
    pub rounds: u64,
    pub converged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRunState {
    Initialized,
    Running,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationNode {
    pub node_id: String,
    pub state: NodeRunState,
    pub is_leader: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationSnapshot {
    pub nodes: Vec<VisualizationNode>,
    pub topology: HashMap<String, Vec<String>>,
    pub timestamp: u64,
}
