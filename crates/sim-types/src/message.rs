use serde::{Deserialize, Serialize};

use crate::node_id::NodeId;

/// Immutable message exchanged between nodes over a `MessagingPort`.
///
/// Wire form is the JSON object `{sender, receiver, messageType, payload, seq?}`;
/// unknown top-level fields are rejected by the transport deserializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub sender: NodeId,
    pub receiver: NodeId,
    #[serde(rename = "messageType")]
    pub message_type: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl Message {
    pub fn new(
        sender: NodeId,
        receiver: NodeId,
        message_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            sender,
            receiver,
            message_type: message_type.into(),
            payload,
            seq: None,
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }
}
