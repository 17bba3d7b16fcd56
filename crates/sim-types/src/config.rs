use serde::{Deserialize, Serialize};

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyType {
    Line,
    Ring,
    Grid,
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub node_count: usize,
    pub topology_type: TopologyType,
}

impl NetworkConfig {
    pub fn new(node_count: usize, topology_type: TopologyType) -> Result<Self, SimError> {
        if node_count == 0 {
            return Err(SimError::InvalidArgument(
                "nodeCount must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            node_count,
            topology_type,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub random_seed: i64,
    pub max_steps: u64,
    pub message_delay_millis: u64,
}

impl SimulationParameters {
    pub fn new(random_seed: i64, max_steps: u64, message_delay_millis: u64) -> Result<Self, SimError> {
        if max_steps == 0 {
            return Err(SimError::InvalidArgument("maxSteps must be >= 1".to_string()));
        }
        Ok(Self {
            random_seed,
            max_steps,
            message_delay_millis,
        })
    }

    /// `{seed=1, maxSteps=100, messageDelayMillis=0}`, used whenever a
    /// session has not had parameters supplied yet.
    pub fn default_parameters() -> Self {
        Self {
            random_seed: 1,
            max_steps: 100,
            message_delay_millis: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub network_config: NetworkConfig,
    pub algorithm_id: String,
    pub default_parameters: SimulationParameters,
}

impl SimulationConfig {
    pub fn new(
        network_config: NetworkConfig,
        algorithm_id: impl Into<String>,
        default_parameters: SimulationParameters,
    ) -> Result<Self, SimError> {
        let algorithm_id = algorithm_id.into();
        if algorithm_id.trim().is_empty() {
            return Err(SimError::InvalidArgument(
                "algorithmId must not be blank".to_string(),
            ));
        }
        Ok(Self {
            network_config,
            algorithm_id,
            default_parameters,
        })
    }
}

/// Default algorithm id used when a session has none configured yet.
pub const DEFAULT_ALGORITHM_ID: &str = "flooding-leader-election";
