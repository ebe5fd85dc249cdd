//! The exploration session state machine.

use std::collections::VecDeque;

use mazebot_geometry::{Pose2D, WorldPoint};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::astar::PathPlanner;
use crate::frontier_exploration::FrontierExploration;
use crate::map::OccupancyMap;

use super::config::{ControllerVariant, ExplorationConfig};
use super::state::{ExplorationEvent, ExplorationState, MapSummary};
use super::strategy::{Action, ExplorationStrategy};

type Subscriber = Box<dyn FnMut(&ExplorationEvent) + Send>;

/// Drives one exploration session: explore, reach the goal, return to start.
///
/// The machine does no timing of its own. The owner calls [`update`] once per
/// tick with the current pose and a local-frame scan and moves the robot to
/// the returned pose.
///
/// [`update`]: ExplorationStateMachine::update
pub struct ExplorationStateMachine<R: RngCore = StdRng> {
    config: ExplorationConfig,
    start: Pose2D,
    goal: WorldPoint,
    map: OccupancyMap,
    planner: PathPlanner,
    strategy: Box<dyn ExplorationStrategy>,
    rng: R,
    state: ExplorationState,
    pose: Pose2D,
    running: bool,
    paused: bool,
    step_count: u64,
    frontiers: Vec<WorldPoint>,
    exploration_path: VecDeque<WorldPoint>,
    goal_path: VecDeque<WorldPoint>,
    return_path: VecDeque<WorldPoint>,
    navigation_retries: u32,
    subscribers: Vec<Subscriber>,
}

impl ExplorationStateMachine<StdRng> {
    /// Creates an idle session seeded from the operating system.
    pub fn new(config: ExplorationConfig, start: Pose2D, goal: WorldPoint) -> Self {
        Self::with_rng(config, start, goal, StdRng::from_os_rng())
    }
}

impl<R: RngCore> ExplorationStateMachine<R> {
    /// Creates an idle session that draws random numbers from `rng`.
    pub fn with_rng(config: ExplorationConfig, start: Pose2D, goal: WorldPoint, rng: R) -> Self {
        let map = OccupancyMap::new(config.map).with_pose_graph_config(config.pose_graph);
        let strategy = config
            .params
            .strategy
            .build(&config.params, config.planner, config.map.max_range);
        ExplorationStateMachine {
            planner: PathPlanner::new(config.planner),
            config,
            start,
            goal,
            map,
            strategy,
            rng,
            state: ExplorationState::Initialization,
            pose: start,
            running: false,
            paused: false,
            step_count: 0,
            frontiers: Vec::new(),
            exploration_path: VecDeque::new(),
            goal_path: VecDeque::new(),
            return_path: VecDeque::new(),
            navigation_retries: 0,
            subscribers: Vec::new(),
        }
    }

    /// Registers an observer. Events are delivered synchronously, in order.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&ExplorationEvent) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Starts the session. Does nothing if already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.paused = false;
        info!(
            start = %self.start,
            goal = %self.goal,
            strategy = self.strategy.name(),
            variant = ?self.config.params.variant,
            "Exploration started"
        );
        match self.config.params.variant {
            ControllerVariant::Advanced => {
                self.state = ExplorationState::Initialization;
                self.emit(ExplorationEvent::StateChanged(self.state));
                self.emit(ExplorationEvent::Status("exploration started".into()));
            }
            ControllerVariant::Simple => self.transition(ExplorationState::Exploration, "exploration started"),
        }
    }

    /// Stops the session and marks it completed.
    pub fn stop(&mut self) {
        if !self.running && self.state == ExplorationState::Completed {
            return;
        }
        self.paused = false;
        self.transition(ExplorationState::Completed, "exploration stopped");
    }

    /// Pauses or resumes. Ticks are ignored while paused.
    pub fn toggle_pause(&mut self) {
        if !self.running {
            return;
        }
        self.paused = !self.paused;
        let status = if self.paused { "paused" } else { "resumed" };
        info!(step = self.step_count, "Exploration {status}");
        self.emit(ExplorationEvent::Status(status.into()));
    }

    /// Returns to the idle state at the start pose with an empty map.
    pub fn reset(&mut self) {
        self.running = false;
        self.paused = false;
        self.state = ExplorationState::Initialization;
        self.pose = self.start;
        self.step_count = 0;
        self.navigation_retries = 0;
        self.frontiers.clear();
        self.exploration_path.clear();
        self.goal_path.clear();
        self.return_path.clear();
        self.planner.clear_path();
        self.map.clear();
        info!("Exploration reset");
        self.emit(ExplorationEvent::StateChanged(self.state));
        self.emit(ExplorationEvent::Status("reset".into()));
    }

    /// Runs one tick from `pose` with a scan in the robot frame.
    ///
    /// # Returns
    ///
    /// The pose the robot should move to, or `None` when the session is not
    /// running or is paused.
    pub fn update(&mut self, pose: Pose2D, scan: &[WorldPoint]) -> Option<Pose2D> {
        if !self.running || self.paused {
            return None;
        }
        self.step_count += 1;
        self.pose = pose;
        self.map.update(pose, scan);
        self.emit(ExplorationEvent::PoseChanged(pose));

        match self.state {
            ExplorationState::Initialization => {
                self.transition(ExplorationState::Exploration, "initialization complete")
            }
            ExplorationState::Exploration => self.explore(),
            ExplorationState::SearchGoal => self.search_goal(),
            ExplorationState::NavigateToGoal => self.navigate_to_goal(),
            ExplorationState::PathPlanning => self.plan_return(),
            ExplorationState::Navigation => self.navigate_home(),
            ExplorationState::Completed => self.running = false,
        }

        let progress = self.progress();
        self.emit(ExplorationEvent::Progress(progress));
        let summary = self.map_summary();
        self.emit(ExplorationEvent::MapUpdated(summary));
        Some(self.pose)
    }

    fn explore(&mut self) {
        let params = self.config.params;
        self.frontiers =
            FrontierExploration::find_frontiers(self.map.free_space(), self.map.obstacles(), params.frontier_threshold);

        if self.pose.position().distance_to(&self.goal) < params.goal_tolerance {
            self.exploration_path.clear();
            self.transition(ExplorationState::NavigateToGoal, "goal in range");
            return;
        }
        if self.step_count > params.exploration_step_limit {
            self.exploration_path.clear();
            self.transition(ExplorationState::SearchGoal, "exploration step limit reached");
            return;
        }
        if advance(&mut self.pose, &mut self.exploration_path) {
            return;
        }

        match self
            .strategy
            .decide(&self.pose, &self.frontiers, &self.map, &mut self.rng)
        {
            Action::Hold => {}
            Action::Turn { theta } => self.pose.theta = theta,
            Action::MoveTo(pose) => self.pose = pose,
            Action::FollowPath(path) => {
                debug!(waypoints = path.len(), frontiers = self.frontiers.len(), "Following frontier path");
                self.exploration_path = path.into();
                advance(&mut self.pose, &mut self.exploration_path);
            }
        }
    }

    fn search_goal(&mut self) {
        if self.planner.plan_path(self.pose.position(), self.goal, &self.map) {
            self.goal_path = self.planner.path().into();
            let status = format!("path to goal found ({} waypoints)", self.goal_path.len());
            self.transition(ExplorationState::NavigateToGoal, status);
        } else {
            self.transition(ExplorationState::Exploration, "goal unreachable, exploring");
        }
    }

    fn navigate_to_goal(&mut self) {
        if self.pose.position().distance_to(&self.goal) < self.config.params.goal_tolerance {
            self.goal_path.clear();
            self.transition(ExplorationState::PathPlanning, "goal reached");
        } else if !advance(&mut self.pose, &mut self.goal_path) {
            self.transition(ExplorationState::SearchGoal, "goal path exhausted");
        }
    }

    fn plan_return(&mut self) {
        if self.plan_home() {
            self.navigation_retries = 0;
            let status = format!("returning to start ({} waypoints)", self.return_path.len());
            self.transition(ExplorationState::Navigation, status);
        } else {
            self.transition(ExplorationState::Completed, "no path back to start");
        }
    }

    fn navigate_home(&mut self) {
        if self.pose.distance_to(&self.start) < self.config.params.goal_tolerance {
            self.return_path.clear();
            self.transition(ExplorationState::Completed, "returned to start");
            return;
        }
        if advance(&mut self.pose, &mut self.return_path) {
            return;
        }

        self.navigation_retries += 1;
        if self.navigation_retries > self.config.params.max_navigation_retries {
            warn!(retries = self.navigation_retries - 1, "Giving up on returning to start");
            self.transition(ExplorationState::Completed, "gave up returning to start");
        } else if self.plan_home() {
            debug!(retry = self.navigation_retries, waypoints = self.return_path.len(), "Return path re-planned");
        } else {
            self.transition(ExplorationState::Completed, "no path back to start");
        }
    }

    fn plan_home(&mut self) -> bool {
        let found = self
            .planner
            .plan_path(self.pose.position(), self.start.position(), &self.map);
        self.return_path = if found { self.planner.path().into() } else { VecDeque::new() };
        found
    }

    fn transition(&mut self, next: ExplorationState, status: impl Into<String>) {
        let status = status.into();
        info!(from = %self.state, to = %next, step = self.step_count, %status, "State changed");
        self.state = next;
        if next == ExplorationState::Completed {
            self.running = false;
        }
        self.emit(ExplorationEvent::StateChanged(next));
        self.emit(ExplorationEvent::Status(status));
    }

    fn emit(&mut self, event: ExplorationEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
    }

    fn map_summary(&self) -> MapSummary {
        let graph = self.map.pose_graph();
        MapSummary {
            step: self.step_count,
            cells: self.map.cell_counts(),
            explored_ratio: self.map.explored_ratio(),
            obstacle_points: self.map.obstacles().len(),
            free_space_points: self.map.free_space().len(),
            keyframes: graph.keyframe_count(),
            loop_closures: graph.loop_closure_count(),
        }
    }

    /// Progress in percent, driven by the step count.
    pub fn progress(&self) -> f32 {
        let scale = self.config.params.progress_step_scale.max(1) as f32;
        (self.step_count as f32 / scale * 100.0).min(100.0)
    }

    /// Current state.
    pub fn state(&self) -> ExplorationState {
        self.state
    }

    /// The pose of the last tick, after the tick's move.
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Pose the session started from and returns to.
    pub fn start_pose(&self) -> Pose2D {
        self.start
    }

    /// Goal position.
    pub fn goal(&self) -> WorldPoint {
        self.goal
    }

    /// Ticks run since `start` or `reset`.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Whether ticks are being processed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the session is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Name of the active exploration strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// The session configuration.
    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Frontiers found on the last exploring tick.
    pub fn frontiers(&self) -> Vec<WorldPoint> {
        self.frontiers.clone()
    }

    /// Remaining waypoints of the current frontier path.
    pub fn planned_path(&self) -> Vec<WorldPoint> {
        self.exploration_path.iter().copied().collect()
    }

    /// Remaining waypoints towards the goal.
    pub fn goal_path(&self) -> Vec<WorldPoint> {
        self.goal_path.iter().copied().collect()
    }

    /// Remaining waypoints back to the start.
    pub fn return_path(&self) -> Vec<WorldPoint> {
        self.return_path.iter().copied().collect()
    }

    /// The map built so far.
    pub fn map(&self) -> &OccupancyMap {
        &self.map
    }

    /// Multi-line summary of the session.
    pub fn statistics(&self) -> String {
        format!(
            "state: {}\nsteps: {}\nprogress: {:.1}%\npose: {}\nfrontiers: {}\nstrategy: {}\nplanner: {}\n{}",
            self.state,
            self.step_count,
            self.progress(),
            self.pose,
            self.frontiers.len(),
            self.strategy.name(),
            self.planner.statistics(),
            self.map.statistics()
        )
    }
}

/// Moves `pose` to the next waypoint, facing the direction of travel.
fn advance(pose: &mut Pose2D, path: &mut VecDeque<WorldPoint>) -> bool {
    let Some(next) = path.pop_front() else {
        return false;
    };
    let here = pose.position();
    if next != here {
        pose.theta = here.bearing_to(&next);
    }
    pose.x = next.x;
    pose.y = next.y;
    true
}
