use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Opaque node identifier with a defined total order.
///
/// If both ids match the canonical pattern `node-<n>` (or both are purely
/// numeric), they compare by the integer `n`; otherwise they compare
/// lexicographically.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Result<Self, SimError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SimError::InvalidArgument("node id must not be empty".into()));
        }
        Ok(Self(value))
    }

    /// Construct the canonical id for position `index` in a generated topology.
    pub fn from_index(index: usize) -> Self {
        Self(index.to_string())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    fn ordinal(&self) -> Option<i64> {
        if let Ok(n) = self.0.parse::<i64>() {
            return Some(n);
        }
        self.0.strip_prefix("node-").and_then(|rest| rest.parse::<i64>().ok())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_compare_by_value() {
        let a = NodeId::new("2").unwrap();
        let b = NodeId::new("10").unwrap();
        assert!(a < b, "numeric comparison should treat 10 as greater than 2");
    }

    #[test]
    fn node_prefixed_ids_compare_by_value() {
        let a = NodeId::new("node-3").unwrap();
        let b = NodeId::new("node-12").unwrap();
        assert!(a < b);
    }

    #[test]
    fn non_numeric_ids_fall_back_to_lexicographic() {
        let a = NodeId::new("alice").unwrap();
        let b = NodeId::new("bob").unwrap();
        assert!(a < b);
    }

    #[test]
    fn empty_id_rejected() {
        assert!(NodeId::new("").is_err());
    }
}
