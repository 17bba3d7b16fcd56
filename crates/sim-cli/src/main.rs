use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sim_session::SessionController;
use sim_types::{NetworkConfig, SimulationConfig, SimulationParameters, TopologyType};

/// Headless runner for the simulation core: drives one session end to end
/// through `SessionController` and prints a summary.
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless distributed-algorithm simulation runner")]
struct Args {
    /// Load a `SimulationConfig` from a TOML file instead of the flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    node_count: usize,

    #[arg(long, value_enum, default_value = "line")]
    topology: TopologyArg,

    #[arg(long, default_value = "flooding-leader-election")]
    algorithm: String,

    #[arg(long, default_value_t = 1)]
    seed: i64,

    #[arg(long, default_value_t = 100)]
    max_steps: u64,

    #[arg(long, default_value_t = 0)]
    delay_millis: u64,

    /// How long to let the simulation run before stopping and reporting.
    #[arg(long, default_value_t = 500)]
    run_millis: u64,

    /// `json` or `csv`; omit to skip export.
    #[arg(long)]
    export_format: Option<String>,

    /// Destination file for `--export-format`'s output.
    #[arg(long)]
    export_out: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TopologyArg {
    Line,
    Ring,
    Grid,
    Random,
}

impl From<TopologyArg> for TopologyType {
    fn from(value: TopologyArg) -> Self {
        match value {
            TopologyArg::Line => TopologyType::Line,
            TopologyArg::Ring => TopologyType::Ring,
            TopologyArg::Grid => TopologyType::Grid,
            TopologyArg::Random => TopologyType::Random,
        }
    }
}

impl Args {
    fn load_config(&self) -> Result<SimulationConfig> {
        if let Some(path) = &self.config {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config: SimulationConfig =
                toml::from_str(&content).context("failed to parse config file")?;
            return Ok(config);
        }

        let network_config = NetworkConfig::new(self.node_count, self.topology.into())?;
        let parameters = SimulationParameters::new(self.seed, self.max_steps, self.delay_millis)?;
        Ok(SimulationConfig::new(
            network_config,
            self.algorithm.clone(),
            parameters,
        )?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    info!("sim-cli starting...");

    let config = args.load_config()?;
    let controller = SessionController::new();

    let sid = controller
        .initialize_network(config.network_config.clone(), Some(config.default_parameters.random_seed))
        .await?;
    controller.select_algorithm(&sid, &config.algorithm_id).await?;
    controller
        .start_simulation(&sid, config.default_parameters)
        .await?;

    info!("running for {}ms...", args.run_millis);
    tokio::time::sleep(std::time::Duration::from_millis(args.run_millis)).await;

    controller.stop_simulation(&sid).await?;

    let metrics = controller.get_metrics(&sid).await?;
    let visualization = controller.get_current_visualization(&sid).await?;
    println!(
        "converged={} leader={:?} rounds={} messages={}",
        metrics.converged, metrics.leader_id, metrics.rounds, metrics.message_count
    );
    for node in &visualization.nodes {
        println!(
            "  {} state={:?} leader={}",
            node.node_id, node.state, node.is_leader
        );
    }

    if let Some(format) = &args.export_format {
        let exported = controller.export_run_data(&sid, format).await?;
        match &args.export_out {
            Some(path) => {
                fs::write(path, &exported)
                    .with_context(|| format!("failed to write export file {}", path.display()))?;
                info!("wrote export to {}", path.display());
            }
            None => println!("{exported}"),
        }
    }

    Ok(())
}
