pub mod context;
pub mod node;

pub use context::PortContext;
pub use node::{NodeState, SimulationNode};
