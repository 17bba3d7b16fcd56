pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod metrics;
pub mod node_id;
pub mod session_id;

pub use config::{
    NetworkConfig, SimulationConfig, SimulationParameters, TopologyType, DEFAULT_ALGORITHM_ID,
};
pub use error::SimError;
pub use event::{Event, EventKind};
pub use message::Message;
pub use metrics::{MetricsSnapshot, NodeRunState, VisualizationNode, VisualizationSnapshot};
pub use node_id::NodeId;
pub use session_id::SessionId;
