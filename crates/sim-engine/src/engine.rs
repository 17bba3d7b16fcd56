use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use sim_algorithms::{AlgorithmRegistry, NodeAlgorithm, NodeContext};
use sim_node::SimulationNode;
use sim_topology::NeighborMap;
use sim_transport::{InProcessMessagingPort, MessagingPort};
use sim_types::{Event, EventKind, Message, NetworkConfig, NodeId, SimError, SimulationParameters};
use tokio::task::JoinHandle;

use crate::event_bus::EventBus;
use crate::metrics::MetricsAggregator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Running,
    Paused,
    Stopped,
}

/// A no-op placeholder bound to every node before an algorithm has been
/// selected; `configureAlgorithm` replaces it.
struct NoopAlgorithm;

impl NodeAlgorithm for NoopAlgorithm {
    fn on_start(&mut self, _ctx: &mut dyn NodeContext) {}
    fn on_message(&mut self, _ctx: &mut dyn NodeContext, _message: &Message) {}
}

/// Orchestrates one session: creates nodes, starts/pauses/resumes/stops,
/// drives the simulation loop, publishes events, tracks metrics, detects
/// convergence.
pub struct SimulationEngine {
    port: Arc<dyn MessagingPort>,
    registry: Arc<AlgorithmRegistry>,
    pub event_bus: Arc<EventBus>,
    pub metrics: Arc<MetricsAggregator>,

    topology: RwLock<NeighborMap>,
    max_node_id: Arc<RwLock<Option<NodeId>>>,
    nodes: Arc<RwLock<HashMap<NodeId, Arc<Mutex<SimulationNode>>>>>,
    algorithm_id: RwLock<Option<String>>,

    state: Arc<RwLock<EngineState>>,
    current_step: Arc<AtomicU64>,
    stop_flag: Arc<AtomicBool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    parameters: RwLock<Option<SimulationParameters>>,
}

impl SimulationEngine {
    pub fn new(registry: Arc<AlgorithmRegistry>) -> Self {
        let event_bus = Arc::new(EventBus::new());
        let metrics = Arc::new(MetricsAggregator::new());
        let current_step = Arc::new(AtomicU64::new(0));

        let event_bus_for_port = event_bus.clone();
        let current_step_for_port = current_step.clone();
        let port: Arc<dyn MessagingPort> = Arc::new(InProcessMessagingPort::new(Arc::new(
            move |node_id: NodeId, message: String| {
                let ts = current_step_for_port.load(Ordering::SeqCst) as i64;
                event_bus_for_port.publish(Event::new(ts, EventKind::Error, node_id.value(), message));
            },
        )));

        Self {
            port,
            registry,
            event_bus,
            metrics,
            topology: RwLock::new(HashMap::new()),
            max_node_id: Arc::new(RwLock::new(None)),
            nodes: Arc::new(RwLock::new(HashMap::new())),
            algorithm_id: RwLock::new(None),
            state: Arc::new(RwLock::new(EngineState::Uninitialized)),
            current_step,
            stop_flag: Arc::new(AtomicBool::new(false)),
            loop_handle: Mutex::new(None),
            parameters: RwLock::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    pub fn algorithm_id(&self) -> Option<String> {
        self.algorithm_id.read().clone()
    }

    pub fn topology(&self) -> NeighborMap {
        self.topology.read().clone()
    }

    pub fn metrics_snapshot(&self) -> sim_types::MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.read().keys().cloned().collect()
    }

    /// Generates topology, creates node shells (placeholder algorithm),
    /// registers handlers, transitions state to `Initialized`.
    pub fn create_network(&self, config: &NetworkConfig, seed: i64) -> Result<(), SimError> {
        let map = sim_topology::generate(config.node_count, config.topology_type, seed)?;
        let max_id = map.keys().max().cloned();
        *self.topology.write() = map;
        *self.max_node_id.write() = max_id;
        *self.algorithm_id.write() = None;

        self.rebuild_nodes(None)?;
        *self.state.write() = EngineState::Initialized;
        Ok(())
    }

    /// Resolves `algorithm_id` via the registry, instantiates fresh
    /// algorithms, and rebuilds nodes (re-registering handlers atomically
    /// per node).
    pub fn configure_algorithm(&self, algorithm_id: &str) -> Result<(), SimError> {
        if !self.registry.contains(algorithm_id) {
            return Err(SimError::InvalidArgument(format!(
                "unknown algorithm id: {algorithm_id}"
            )));
        }
        self.rebuild_nodes(Some(algorithm_id))?;
        *self.algorithm_id.write() = Some(algorithm_id.to_string());
        Ok(())
    }

    fn rebuild_nodes(&self, algorithm_id: Option<&str>) -> Result<(), SimError> {
        let topology = self.topology.read().clone();

        for node_id in topology.keys() {
            self.port.unregister_handler(node_id);
        }

        let mut nodes = self.nodes.write();
        nodes.clear();

        for (node_id, neighbors) in topology.iter() {
            let algorithm: Box<dyn NodeAlgorithm> = match algorithm_id {
                Some(id) => self.registry.instantiate(id)?,
                None => Box::new(NoopAlgorithm),
            };

            let metrics = self.metrics.clone();
            let on_message_sent: Arc<dyn Fn() + Send + Sync> =
                Arc::new(move || metrics.increment_message_count());

            let node = Arc::new(Mutex::new(SimulationNode::new(
                node_id.clone(),
                neighbors.clone(),
                algorithm,
                self.port.clone(),
                on_message_sent,
            )));

            let node_for_handler = node.clone();
            self.port.register_handler(
                node_id.clone(),
                Box::new(move |message| {
                    let _ = node_for_handler.lock().on_message(message);
                }),
            );

            nodes.insert(node_id.clone(), node);
        }

        Ok(())
    }

    fn publish_state_changed(&self, node_id: &str, summary: &str) {
        let ts = self.current_step.load(Ordering::SeqCst) as i64;
        self.event_bus
            .publish(Event::new(ts, EventKind::StateChanged, node_id, summary));
    }

    /// Requires `Initialized` state and a selected algorithm. Resets
    /// metrics, marks every node ready, runs every node's `on_start`, then
    /// launches the simulation loop.
    pub async fn start(&self, parameters: SimulationParameters) -> Result<(), SimError> {
        if *self.state.read() != EngineState::Initialized {
            return Err(SimError::IllegalState(
                "engine must be INITIALIZED to start".to_string(),
            ));
        }
        if self.algorithm_id.read().is_none() {
            return Err(SimError::IllegalState(
                "no algorithm selected; call configureAlgorithm first".to_string(),
            ));
        }

        self.metrics.start();
        self.current_step.store(0, Ordering::SeqCst);
        self.stop_flag.store(false, Ordering::SeqCst);
        *self.parameters.write() = Some(parameters);
        *self.state.write() = EngineState::Running;
        self.publish_state_changed("system", "Simulation started");

        {
            let nodes = self.nodes.read();
            for node in nodes.values() {
                node.lock().mark_ready()?;
            }
        }
        {
            let nodes = self.nodes.read();
            for (node_id, node) in nodes.iter() {
                node.lock().on_start()?;
                self.publish_state_changed(node_id.value(), "Node started");
            }
        }

        self.spawn_loop(parameters);
        Ok(())
    }

    pub fn pause(&self) -> Result<(), SimError> {
        {
            let mut state = self.state.write();
            if *state != EngineState::Running {
                return Err(SimError::IllegalState("pause requires RUNNING".to_string()));
            }
            *state = EngineState::Paused;
        }
        self.publish_state_changed("system", "Simulation paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), SimError> {
        {
            let mut state = self.state.write();
            if *state != EngineState::Paused {
                return Err(SimError::IllegalState("resume requires PAUSED".to_string()));
            }
            *state = EngineState::Running;
        }
        self.publish_state_changed("system", "Simulation resumed");
        Ok(())
    }

    /// Idempotent: signals the loop to exit, waits up to 5s for
    /// termination, finalizes metrics, publishes "Simulation stopped", then
    /// unregisters all handlers.
    pub async fn stop(&self) -> Result<(), SimError> {
        if *self.state.read() == EngineState::Stopped {
            return Ok(());
        }

        self.stop_flag.store(true, Ordering::SeqCst);
        let handle = self.loop_handle.lock().take();

        match handle {
            Some(handle) => {
                let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
            }
            None => {}
        }

        if *self.state.read() != EngineState::Stopped {
            let nodes = self.nodes.read();
            let max_node_id = self.max_node_id.read().clone();
            let ts = self.current_step.load(Ordering::SeqCst) as i64;
            finalize_and_stop(
                &nodes,
                &max_node_id,
                &self.metrics,
                &self.event_bus,
                self.port.as_ref(),
                &self.state,
                ts,
                false,
            );
        }
        Ok(())
    }

    fn spawn_loop(&self, parameters: SimulationParameters) {
        let state = self.state.clone();
        let nodes = self.nodes.clone();
        let metrics = self.metrics.clone();
        let event_bus = self.event_bus.clone();
        let current_step = self.current_step.clone();
        let stop_flag = self.stop_flag.clone();
        let max_node_id = self.max_node_id.clone();
        let port = self.port.clone();
        let max_steps = parameters.max_steps;
        let message_delay_millis = parameters.message_delay_millis;

        let handle = tokio::spawn(async move {
            loop {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
                let step = current_step.load(Ordering::SeqCst);
                if step >= max_steps {
                    break;
                }

                if *state.read() == EngineState::Paused {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }

                let next_step = step + 1;
                if next_step % 10 == 0 {
                    let ts = next_step as i64;
                    let nodes_snapshot = nodes.read();
                    let max_id = max_node_id.read().clone();
                    inspect_convergence(&nodes_snapshot, &max_id, &metrics, &event_bus, ts);
                }
                current_step.store(next_step, Ordering::SeqCst);
                metrics.advance(1);

                tokio::time::sleep(Duration::from_millis(message_delay_millis.max(1))).await;
            }

            let step = current_step.load(Ordering::SeqCst);
            let reached_max = !stop_flag.load(Ordering::SeqCst) && step >= max_steps;
            if reached_max {
                let nodes_snapshot = nodes.read();
                let max_id = max_node_id.read().clone();
                finalize_and_stop(
                    &nodes_snapshot,
                    &max_id,
                    &metrics,
                    &event_bus,
                    port.as_ref(),
                    &state,
                    step as i64,
                    true,
                );
            } else if stop_flag.load(Ordering::SeqCst) {
                let nodes_snapshot = nodes.read();
                let max_id = max_node_id.read().clone();
                finalize_and_stop(
                    &nodes_snapshot,
                    &max_id,
                    &metrics,
                    &event_bus,
                    port.as_ref(),
                    &state,
                    step as i64,
                    false,
                );
            }
        });

        *self.loop_handle.lock() = Some(handle);
    }
}

#[allow(clippy::too_many_arguments)]
fn finalize_and_stop(
    nodes: &HashMap<NodeId, Arc<Mutex<SimulationNode>>>,
    max_node_id: &Option<NodeId>,
    metrics: &MetricsAggregator,
    event_bus: &EventBus,
    port: &dyn MessagingPort,
    state: &RwLock<EngineState>,
    timestamp: i64,
    max_steps_reached: bool,
) {
    inspect_convergence(nodes, max_node_id, metrics, event_bus, timestamp);
    if max_steps_reached {
        event_bus.publish(Event::new(
            timestamp,
            EventKind::StateChanged,
            "system",
            "reached maxSteps",
        ));
    }
    *state.write() = EngineState::Stopped;
    event_bus.publish(Event::new(
        timestamp,
        EventKind::StateChanged,
        "system",
        "Simulation stopped",
    ));
    for node_id in nodes.keys() {
        port.unregister_handler(node_id);
    }
}

/// Inspects every node's reported leader. Publishes `LEADER_ELECTED` when a
/// fresh stable leader emerges, a warning when a stable leader is not the
/// network maximum, and clears convergence when nodes disagree.
fn inspect_convergence(
    nodes: &HashMap<NodeId, Arc<Mutex<SimulationNode>>>,
    max_node_id: &Option<NodeId>,
    metrics: &MetricsAggregator,
    event_bus: &EventBus,
    timestamp: i64,
) {
    if nodes.is_empty() {
        return;
    }

    let leaders: Vec<Option<NodeId>> = nodes
        .values()
        .map(|node| node.lock().snapshot_state().and_then(|s| s.current_leader))
        .collect();

    if leaders.iter().any(|l| l.is_none()) {
        metrics.set_converged(false);
        metrics.set_leader(None);
        return;
    }

    let first = leaders[0].clone();
    if !leaders.iter().all(|l| l == &first) {
        metrics.set_converged(false);
        metrics.set_leader(None);
        return;
    }

    let leader = first.expect("checked non-empty above");

    if let Some(max_id) = max_node_id {
        if &leader != max_id {
            event_bus.publish(Event::new(
                timestamp,
                EventKind::StateChanged,
                "system",
                "leader is not the maximum id",
            ));
        }
    }

    let previous = metrics.leader();
    metrics.set_converged(true);
    if previous.as_ref() != Some(&leader) {
        metrics.set_leader(Some(leader.clone()));
        event_bus.publish(
            Event::new(timestamp, EventKind::LeaderElected, leader.value(), "leader elected")
                .with_peer(leader.value()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_types::{NetworkConfig, TopologyType};
    use std::time::Duration;

    fn started_engine(
        node_count: usize,
        topology: TopologyType,
        max_steps: u64,
    ) -> Arc<SimulationEngine> {
        let registry = Arc::new(AlgorithmRegistry::with_builtins());
        let engine = Arc::new(SimulationEngine::new(registry));
        let config = NetworkConfig::new(node_count, topology).unwrap();
        engine.create_network(&config, 1).unwrap();
        engine.configure_algorithm("flooding-leader-election").unwrap();
        engine
    }

    #[tokio::test]
    async fn line_of_three_converges_on_highest_id() {
        let engine = started_engine(3, TopologyType::Line, 100);
        engine
            .start(SimulationParameters::new(1, 100, 1).unwrap())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let snap = engine.metrics_snapshot();
        assert!(snap.converged);
        assert_eq!(snap.leader_id.as_deref(), Some("2"));

        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn ring_of_five_converges_on_highest_id() {
        let engine = started_engine(5, TopologyType::Ring, 100);
        engine
            .start(SimulationParameters::new(1, 100, 1).unwrap())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let snap = engine.metrics_snapshot();
        assert!(snap.converged);
        assert_eq!(snap.leader_id.as_deref(), Some("4"));

        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn max_steps_is_enforced() {
        let engine = started_engine(3, TopologyType::Ring, 5);
        engine
            .start(SimulationParameters::new(1, 5, 1).unwrap())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine.metrics_snapshot().rounds <= 5);
    }

    #[tokio::test]
    async fn pause_halts_round_advancement_until_resumed() {
        let engine = started_engine(3, TopologyType::Line, 10_000);
        engine
            .start(SimulationParameters::new(1, 10_000, 10).unwrap())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        engine.pause().unwrap();
        let rounds_at_pause = engine.metrics_snapshot().rounds;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.metrics_snapshot().rounds, rounds_at_pause);
        assert_eq!(engine.state(), EngineState::Paused);

        engine.resume().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(engine.metrics_snapshot().rounds > rounds_at_pause);

        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_without_algorithm_is_illegal_state() {
        let registry = Arc::new(AlgorithmRegistry::with_builtins());
        let engine = SimulationEngine::new(registry);
        let config = NetworkConfig::new(2, TopologyType::Line).unwrap();
        engine.create_network(&config, 1).unwrap();

        let err = engine
            .start(SimulationParameters::new(1, 10, 0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::IllegalState(_)));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let engine = started_engine(2, TopologyType::Line, 100);
        engine
            .start(SimulationParameters::new(1, 100, 1).unwrap())
            .await
            .unwrap();
        engine.stop().await.unwrap();
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn single_node_ring_elects_itself() {
        let engine = started_engine(1, TopologyType::Ring, 50);
        engine
            .start(SimulationParameters::new(1, 50, 1).unwrap())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        let snap = engine.metrics_snapshot();
        assert!(snap.converged);
        assert_eq!(snap.leader_id.as_deref(), Some("0"));

        engine.stop().await.unwrap();
    }
}
