pub mod engine;
pub mod event_bus;
pub mod metrics;

pub use engine::{EngineState, SimulationEngine};
pub use event_bus::{EventBus, Listener, SubscriptionId};
pub use metrics::MetricsAggregator;
