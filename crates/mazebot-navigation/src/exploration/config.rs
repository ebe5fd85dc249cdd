//! Exploration session configuration.

use crate::astar::PlannerConfig;
use crate::map::MapConfig;
use crate::slam::PoseGraphConfig;

use super::strategy::StrategyKind;

/// Controller flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerVariant {
    /// `start` leaves the session in `Initialization`; the first tick moves it on.
    #[default]
    Advanced,
    /// `start` enters `Exploration` directly.
    Simple,
}

/// Behavioral parameters of the exploration state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExplorationParams {
    /// Strategy used while in `Exploration`.
    pub strategy: StrategyKind,
    /// Controller flavour.
    pub variant: ControllerVariant,
    /// Distance at which the goal or the start counts as reached (m).
    pub goal_tolerance: f32,
    /// Ticks after which exploration is considered complete.
    pub exploration_step_limit: u64,
    /// Ticks that correspond to 100% progress.
    pub progress_step_scale: u64,
    /// A free-space point closer than this to an obstacle is a frontier (m).
    pub frontier_threshold: f32,
    /// Return-path re-plans before the session gives up.
    pub max_navigation_retries: u32,
    /// Random-walk step length (m).
    pub random_walk_step: f32,
    /// Strategy moves must keep this distance from obstacle points (m).
    pub safety_distance: f32,
    /// Wall-following target clearance on the right (m).
    pub wall_clearance: f32,
    /// Wall-following step length (m).
    pub wall_follow_step: f32,
    /// Wall-following proportional turn gain.
    pub wall_turn_gain: f32,
    /// Wall-following turn limit per tick (rad).
    pub wall_max_turn: f32,
}

impl Default for ExplorationParams {
    fn default() -> Self {
        ExplorationParams {
            strategy: StrategyKind::Hybrid,
            variant: ControllerVariant::Advanced,
            goal_tolerance: 1.0,
            exploration_step_limit: 1000,
            progress_step_scale: 2000,
            frontier_threshold: 0.5,
            max_navigation_retries: 5,
            random_walk_step: 0.5,
            safety_distance: 0.2,
            wall_clearance: 0.3,
            wall_follow_step: 0.2,
            wall_turn_gain: 0.5,
            wall_max_turn: 0.1,
        }
    }
}

/// Everything an exploration session needs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplorationConfig {
    /// Occupancy map geometry and sensor model.
    pub map: MapConfig,
    /// Planning grid.
    pub planner: PlannerConfig,
    /// Pose graph tuning.
    pub pose_graph: PoseGraphConfig,
    /// State machine behavior.
    pub params: ExplorationParams,
}

impl ExplorationConfig {
    /// Default planner, pose graph and behavior around the given map.
    pub fn new(map: MapConfig) -> Self {
        ExplorationConfig {
            map,
            planner: PlannerConfig::default(),
            pose_graph: PoseGraphConfig::default(),
            params: ExplorationParams::default(),
        }
    }
}
