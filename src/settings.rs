use anyhow::{Context, ensure};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

use mazebot_navigation::{ExplorationConfig, ExplorationParams, MapConfig, PlannerConfig, PoseGraphConfig};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "MAZEBOT";

/// Simulated maze, sensor and tick loop.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    /// Tick period (ms).
    pub tick_ms: u64,
    /// The session is stopped after this many ticks.
    pub max_ticks: u64,
    /// Fixed seed for the strategy RNG; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Edge length of one layout character (m).
    pub cell_size: f32,
    pub num_rays: usize,
    /// Laser range (m).
    pub max_range: f32,
    /// Events buffered per telemetry subscriber.
    pub telemetry_capacity: usize,
    pub monitor_interval_ms: u64,
    /// Maze rows, top first: `#` wall, `S` start, `G` goal.
    pub layout: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub map: MapConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub pose_graph: PoseGraphConfig,
    #[serde(default)]
    pub exploration: ExplorationParams,
    pub simulation: SimulationSettings,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.map.validate().context("invalid [map] section")?;
        self.planner.validate().context("invalid [planner] section")?;

        let sim = &self.simulation;
        ensure!(sim.tick_ms > 0, "simulation.tick_ms must be positive");
        ensure!(sim.cell_size > 0.0, "simulation.cell_size must be positive");
        ensure!(sim.num_rays > 0, "simulation.num_rays must be positive");
        ensure!(sim.max_range > 0.0, "simulation.max_range must be positive");
        ensure!(sim.telemetry_capacity > 0, "simulation.telemetry_capacity must be positive");
        ensure!(sim.monitor_interval_ms > 0, "simulation.monitor_interval_ms must be positive");
        ensure!(!sim.layout.is_empty(), "simulation.layout is empty");
        Ok(())
    }

    pub fn exploration_config(&self) -> ExplorationConfig {
        ExplorationConfig {
            map: self.map,
            planner: self.planner,
            pose_graph: self.pose_graph,
            params: self.exploration,
        }
    }
}

/// Loads `config/default.toml`, then `overlay` if given, then `MAZEBOT_*` variables.
pub fn load(overlay: Option<&str>) -> anyhow::Result<Settings> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let mut builder = Config::builder().add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true));
    if let Some(path) = overlay {
        info!("Overlaying configuration from {}", path);
        builder = builder.add_source(File::new(path, FileFormat::Toml).required(true));
    }
    let built = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    let config = match built {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e).context("loading configuration");
        }
    };

    let settings: Settings = config.try_deserialize().context("parsing configuration")?;
    settings.validate()?;
    info!(
        map = %format!("{}x{} m @ {} m/cell", settings.map.width, settings.map.height, settings.map.resolution),
        strategy = ?settings.exploration.strategy,
        "Successfully loaded configuration"
    );
    Ok(settings)
}
