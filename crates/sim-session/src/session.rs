use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sim_engine::SimulationEngine;
use sim_types::{
    Event, EventKind, NetworkConfig, NodeId, SessionId, SimulationConfig, SimulationParameters,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    AlgorithmSelected,
    Running,
    Paused,
    Stopped,
}

/// One simulation instance: its engine, its own event log, and the
/// session-tracked leader (kept separately from the engine's, since the
/// engine's convergence pass clears its leader on a transient disagreement
/// while the session remembers the last confirmed `LEADER_ELECTED`).
pub struct Session {
    pub id: SessionId,
    pub network_config: NetworkConfig,
    pub engine: Arc<SimulationEngine>,
    pub algorithm_id: RwLock<Option<String>>,
    pub parameters: RwLock<Option<SimulationParameters>>,
    pub event_log: Mutex<Vec<Event>>,
    pub leader_id: RwLock<Option<NodeId>>,
    pub state: RwLock<SessionState>,
}

impl Session {
    pub fn new(id: SessionId, network_config: NetworkConfig, engine: Arc<SimulationEngine>) -> Arc<Self> {
        let session = Arc::new(Self {
            id,
            network_config,
            engine,
            algorithm_id: RwLock::new(None),
            parameters: RwLock::new(None),
            event_log: Mutex::new(Vec::new()),
            leader_id: RwLock::new(None),
            state: RwLock::new(SessionState::Created),
        });

        for kind in EventKind::ALL {
            let sink = session.clone();
            session
                .engine
                .event_bus
                .subscribe(kind, Arc::new(move |event: &Event| {
                    sink.event_log.lock().push(event.clone());
                }));
        }

        let leader_sink = session.clone();
        session
            .engine
            .event_bus
            .subscribe(EventKind::LeaderElected, Arc::new(move |event: &Event| {
                if let Ok(leader) = NodeId::new(event.node_id.clone()) {
                    *leader_sink.leader_id.write() = Some(leader);
                }
            }));

        session
    }

    pub fn current_config(&self) -> SimulationConfig {
        let algorithm_id = self
            .algorithm_id
            .read()
            .clone()
            .unwrap_or_else(|| sim_types::DEFAULT_ALGORITHM_ID.to_string());
        let default_parameters =
            (*self.parameters.read()).unwrap_or_else(SimulationParameters::default_parameters);

        SimulationConfig {
            network_config: self.network_config.clone(),
            algorithm_id,
            default_parameters,
        }
    }
}
