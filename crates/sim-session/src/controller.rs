use std::collections::HashMap;
use std::sync::Arc;

use sim_algorithms::AlgorithmRegistry;
use sim_engine::{Listener, SimulationEngine, SubscriptionId};
use sim_types::{
    Event, MetricsSnapshot, NetworkConfig, SessionId, SimError, SimulationConfig,
    SimulationParameters, VisualizationNode, VisualizationSnapshot,
};
use tokio::sync::RwLock;

use crate::export::{self, ExportFormat};
use crate::session::{Session, SessionState};

/// Multiplexes sessions by `SessionId`; the only entry point collaborators
/// (an HTTP/WebSocket surface, a CLI, a test) are expected to drive.
pub struct SessionController {
    registry: Arc<AlgorithmRegistry>,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(AlgorithmRegistry::with_builtins()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_registry(registry: AlgorithmRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn session(&self, sid: &SessionId) -> Result<Arc<Session>, SimError> {
        self.sessions
            .read()
            .await
            .get(sid)
            .cloned()
            .ok_or_else(|| SimError::NotFound(format!("unknown session id: {sid}")))
    }

    /// New session in CREATED; generates topology, builds node shells. No
    /// algorithm or parameters are selected yet — `select_algorithm` and
    /// `start_simulation` are the first points at which those become
    /// `Some` on the session, so `getCurrentConfig`'s documented fallbacks
    /// (`flooding-leader-election`, `{seed=1,maxSteps=100,delay=0}`) are
    /// reachable. `seed` drives RANDOM topology generation only; omit it to
    /// use the default parameters' seed. The session's event bus is wired
    /// (via `Session::new`) before the session is inserted, so no caller
    /// can ever observe a session without a live bus.
    pub async fn initialize_network(
        &self,
        network_config: NetworkConfig,
        seed: Option<i64>,
    ) -> Result<SessionId, SimError> {
        let seed = seed.unwrap_or_else(|| SimulationParameters::default_parameters().random_seed);
        let engine = Arc::new(SimulationEngine::new(self.registry.clone()));
        engine.create_network(&network_config, seed)?;

        let sid = SessionId::new();
        let session = Session::new(sid, network_config, engine);

        self.sessions.write().await.insert(sid, session);
        Ok(sid)
    }

    pub async fn select_algorithm(&self, sid: &SessionId, algorithm_id: &str) -> Result<(), SimError> {
        if algorithm_id.trim().is_empty() {
            return Err(SimError::InvalidArgument("algorithmId must not be blank".to_string()));
        }
        let session = self.session(sid).await?;
        session.engine.configure_algorithm(algorithm_id)?;
        *session.algorithm_id.write() = Some(algorithm_id.to_string());
        *session.state.write() = SessionState::AlgorithmSelected;
        Ok(())
    }

    pub async fn start_simulation(
        &self,
        sid: &SessionId,
        parameters: SimulationParameters,
    ) -> Result<(), SimError> {
        let session = self.session(sid).await?;
        if *session.state.read() != SessionState::AlgorithmSelected {
            return Err(SimError::IllegalState(
                "startSimulation requires ALGORITHM_SELECTED".to_string(),
            ));
        }
        session.engine.start(parameters).await?;
        *session.parameters.write() = Some(parameters);
        *session.state.write() = SessionState::Running;
        Ok(())
    }

    pub async fn pause_simulation(&self, sid: &SessionId) -> Result<(), SimError> {
        let session = self.session(sid).await?;
        if *session.state.read() != SessionState::Running {
            return Err(SimError::IllegalState("pauseSimulation requires RUNNING".to_string()));
        }
        session.engine.pause()?;
        *session.state.write() = SessionState::Paused;
        Ok(())
    }

    pub async fn resume_simulation(&self, sid: &SessionId) -> Result<(), SimError> {
        let session = self.session(sid).await?;
        if *session.state.read() != SessionState::Paused {
            return Err(SimError::IllegalState("resumeSimulation requires PAUSED".to_string()));
        }
        session.engine.resume()?;
        *session.state.write() = SessionState::Running;
        Ok(())
    }

    pub async fn stop_simulation(&self, sid: &SessionId) -> Result<(), SimError> {
        let session = self.session(sid).await?;
        session.engine.stop().await?;
        *session.state.write() = SessionState::Stopped;
        Ok(())
    }

    pub async fn get_current_visualization(&self, sid: &SessionId) -> Result<VisualizationSnapshot, SimError> {
        let session = self.session(sid).await?;
        let topology = session
            .engine
            .topology()
            .into_iter()
            .map(|(node, neighbors)| {
                (
                    node.value().to_string(),
                    neighbors.into_iter().map(|n| n.value().to_string()).collect(),
                )
            })
            .collect();

        let leader = session.leader_id.read().clone();
        let started: std::collections::HashSet<String> = session
            .event_log
            .lock()
            .iter()
            .filter(|e| e.payload_summary == "Node started")
            .map(|e| e.node_id.clone())
            .collect();

        let nodes = session
            .engine
            .node_ids()
            .into_iter()
            .map(|node_id| {
                let id = node_id.value().to_string();
                let state = if started.contains(&id) {
                    sim_types::NodeRunState::Running
                } else {
                    sim_types::NodeRunState::Initialized
                };
                let is_leader = leader.as_ref().map(|l| l.value() == id.as_str()).unwrap_or(false);
                VisualizationNode {
                    node_id: id,
                    state,
                    is_leader,
                }
            })
            .collect::<Vec<VisualizationNode>>();

        Ok(VisualizationSnapshot {
            nodes,
            topology,
            timestamp: session.engine.metrics_snapshot().simulated_time,
        })
    }

    pub async fn register_visualization_listener(
        &self,
        sid: &SessionId,
        listener: Listener,
    ) -> Result<Vec<SubscriptionId>, SimError> {
        let session = self.session(sid).await?;
        Ok(session.engine.event_bus.subscribe_all(listener))
    }

    pub async fn get_metrics(&self, sid: &SessionId) -> Result<MetricsSnapshot, SimError> {
        let session = self.session(sid).await?;
        let mut snapshot = session.engine.metrics_snapshot();
        if let Some(session_leader) = session.leader_id.read().clone() {
            if snapshot.leader_id.as_deref() != Some(session_leader.value()) {
                snapshot.leader_id = Some(session_leader.value().to_string());
            }
        }
        Ok(snapshot)
    }

    pub async fn get_current_config(&self, sid: &SessionId) -> Result<SimulationConfig, SimError> {
        let session = self.session(sid).await?;
        Ok(session.current_config())
    }

    /// Equivalent to `initializeNetwork` followed by `selectAlgorithm`;
    /// parameters are stored but the simulation is not started.
    pub async fn load_config(&self, config: SimulationConfig) -> Result<SessionId, SimError> {
        let sid = self
            .initialize_network(
                config.network_config.clone(),
                Some(config.default_parameters.random_seed),
            )
            .await?;
        self.select_algorithm(&sid, &config.algorithm_id).await?;

        let session = self.session(&sid).await?;
        *session.parameters.write() = Some(config.default_parameters);
        Ok(sid)
    }

    pub async fn export_run_data(&self, sid: &SessionId, format: &str) -> Result<String, SimError> {
        let format = ExportFormat::parse(format)?;
        let session = self.session(sid).await?;
        let events: Vec<Event> = session.event_log.lock().clone();
        let metrics = self.get_metrics(sid).await?;
        export::export(format, &events, &metrics)
    }

    pub async fn get_logs(&self, sid: &SessionId, filter: Option<&str>) -> Result<Vec<String>, SimError> {
        let session = self.session(sid).await?;
        let mut events = session.event_log.lock().clone();
        events.sort_by_key(|e| e.timestamp);

        let filter = filter.map(|f| f.to_ascii_lowercase());
        Ok(events
            .into_iter()
            .filter(|event| match &filter {
                None => true,
                Some(needle) => {
                    event.kind.as_str().to_ascii_lowercase().contains(needle.as_str())
                        || event.node_id.to_ascii_lowercase().contains(needle.as_str())
                        || event
                            .peer_id
                            .as_deref()
                            .map(|p| p.to_ascii_lowercase().contains(needle.as_str()))
                            .unwrap_or(false)
                        || event.payload_summary.to_ascii_lowercase().contains(needle.as_str())
                }
            })
            .map(|event| event.log_line())
            .collect())
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
