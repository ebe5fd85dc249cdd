mod blackboard; // shared telemetry snapshot
mod bus; // broadcast topics
mod maze; // simulated maze and laser
mod settings; // layered configuration

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, info, warn};
use tracing_subscriber::{self, EnvFilter};

use blackboard::{Blackboard, raise_fault, record, snapshot};
use bus::Topic;
use mazebot_navigation::{ExplorationEvent, ExplorationStateMachine};
use maze::{LaserSensor, Maze};
use settings::{Settings, SimulationSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let overlay = std::env::args().nth(1);
    let settings = settings::load(overlay.as_deref())?;
    let maze = Maze::parse(&settings.simulation.layout, settings.simulation.cell_size).context("building maze")?;
    info!(start = %maze.start(), goal = %maze.goal(), "Maze loaded");

    let bb: Blackboard = Arc::default();
    let events: Topic<ExplorationEvent> = Topic::new(settings.simulation.telemetry_capacity);

    let logger = tokio::spawn(log_events(events.subscribe()));
    let monitor = tokio::spawn(monitor(
        bb.clone(),
        Duration::from_millis(settings.simulation.monitor_interval_ms),
    ));

    run_session(&settings, &maze, bb.clone(), events).await?;

    monitor.abort();
    logger.await.context("event logger panicked")??;

    let telemetry = snapshot(&bb);
    info!(
        state = %telemetry.state,
        steps = telemetry.step,
        explored = telemetry.explored_ratio,
        loop_closures = telemetry.loop_closures,
        faults = ?telemetry.faults,
        "Done"
    );
    Ok(())
}

/// Drives one exploration session against the simulated maze.
async fn run_session(settings: &Settings, maze: &Maze, bb: Blackboard, events: Topic<ExplorationEvent>) -> anyhow::Result<()> {
    let sim: &SimulationSettings = &settings.simulation;
    let rng = match sim.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let sensor = LaserSensor::new(sim.num_rays, sim.max_range);
    let start = maze.start();

    let mut session = ExplorationStateMachine::with_rng(settings.exploration_config(), start, maze.goal(), rng);
    session.subscribe(move |e| {
        events.publish(e.clone());
    });
    session.subscribe({
        let bb = bb.clone();
        move |e| record(&bb, e)
    });

    session.start();
    let mut pose = start;
    let mut ticker = time::interval(Duration::from_millis(sim.tick_ms));
    for _ in 0..sim.max_ticks {
        ticker.tick().await;
        let scan = sensor.scan(&pose, maze);
        let Some(commanded) = session.update(pose, &scan) else {
            break;
        };
        pose = maze.realize_motion(&pose, &commanded);
        if !session.is_running() {
            break;
        }
    }

    if session.is_running() {
        warn!(max_ticks = sim.max_ticks, "Tick limit reached, stopping session");
        raise_fault(&bb, "tick limit reached");
        session.stop();
    }

    let graph = session.map().pose_graph();
    info!(
        steps = session.step_count(),
        keyframes = graph.keyframe_count(),
        loop_closures = graph.loop_closure_count(),
        optimizations = graph.optimization_count(),
        "Session finished"
    );
    info!("\n{}", session.statistics());
    debug!("\n{}", session.map().occupancy_grid());
    Ok(())
}

/// Logs session events until every publisher is gone.
async fn log_events(mut rx: broadcast::Receiver<Arc<ExplorationEvent>>) -> anyhow::Result<()> {
    info!("Event logger started.");
    loop {
        match rx.recv().await {
            Ok(event) => match &*event {
                ExplorationEvent::StateChanged(state) => info!(%state, "State changed"),
                ExplorationEvent::Status(status) => info!(%status, "Status"),
                ExplorationEvent::Progress(progress) => debug!(progress, "Progress"),
                ExplorationEvent::MapUpdated(summary) => debug!(
                    step = summary.step,
                    explored = summary.explored_ratio,
                    obstacles = summary.obstacle_points,
                    keyframes = summary.keyframes,
                    "Map updated"
                ),
                ExplorationEvent::PoseChanged(pose) => debug!(%pose, "Pose"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagging"),
            Err(RecvError::Closed) => break,
        }
    }
    info!("Event logger finished.");
    Ok(())
}

/// Periodically reports the blackboard and flags stale telemetry.
async fn monitor(bb: Blackboard, period: Duration) -> anyhow::Result<()> {
    info!("Monitor task started.");
    let mut tick = time::interval(period);
    loop {
        tick.tick().await;
        let telemetry = snapshot(&bb);
        let age = Instant::now() - telemetry.last_update_ts;
        if age > period * 4 {
            warn!(?age, "No telemetry from the session");
            raise_fault(&bb, "telemetry stale");
        }
        info!(
            state = %telemetry.state,
            step = telemetry.step,
            progress = telemetry.progress,
            pose = %telemetry.pose,
            obstacles = telemetry.obstacle_points,
            keyframes = telemetry.keyframes,
            status = %telemetry.last_status,
            "Telemetry"
        );
    }
}
