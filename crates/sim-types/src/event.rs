use serde::{Deserialize, Serialize};

/// Kinds of observable events published on a session's event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "MESSAGE_SENT")]
    MessageSent,
    #[serde(rename = "MESSAGE_RECEIVED")]
    MessageReceived,
    #[serde(rename = "STATE_CHANGED")]
    StateChanged,
    #[serde(rename = "LEADER_ELECTED")]
    LeaderElected,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "METRICS_UPDATE")]
    MetricsUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageSent => "MESSAGE_SENT",
            EventKind::MessageReceived => "MESSAGE_RECEIVED",
            EventKind::StateChanged => "STATE_CHANGED",
            EventKind::LeaderElected => "LEADER_ELECTED",
            EventKind::Error => "ERROR",
            EventKind::MetricsUpdate => "METRICS_UPDATE",
        }
    }

    pub const ALL: [EventKind; 6] = [
        EventKind::MessageSent,
        EventKind::MessageReceived,
        EventKind::StateChanged,
        EventKind::LeaderElected,
        EventKind::Error,
        EventKind::MetricsUpdate,
    ];
}

/// An append-only, observable record of something that happened during a
/// session. Wire form is `{timestamp, type, nodeId, peerId, payloadSummary}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(rename = "payloadSummary")]
    pub payload_summary: String,
}

impl Event {
    pub fn new(
        timestamp: i64,
        kind: EventKind,
        node_id: impl Into<String>,
        payload_summary: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            node_id: node_id.into(),
            peer_id: None,
            payload_summary: payload_summary.into(),
        }
    }

    pub fn with_peer(mut self, peer_id: impl Into<String>) -> Self {
        self.peer_id = Some(peer_id.into());
        self
    }

    /// Log-entry text, per the `[<ts>] [<KIND>] <nodeId>[ -> <peerId>]: <payloadSummary>` format.
    pub fn log_line(&self) -> String {
        match &self.peer_id {
            Some(peer) => format!(
                "[{}] [{}] {} -> {}: {}",
                self.timestamp,
                self.kind.as_str(),
                self.node_id,
                peer,
                self.payload_summary
            ),
            None => format!(
                "[{}] [{}] {}: {}",
                self.timestamp,
                self.kind.as_str(),
                self.node_id,
                self.payload_summary
            ),
        }
    }
}
