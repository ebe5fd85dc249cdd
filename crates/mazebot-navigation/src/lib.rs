//! Mapping, SLAM, planning and exploration for a maze-mapping robot.
//!
//! - [`map`]: occupancy grid with Bayesian cell updates plus point-based obstacle
//!   and free-space lists.
//! - [`slam`]: keyframe pose graph with loop-closure detection and relaxation.
//! - [`astar`]: grid A* planner over rasterized obstacle points.
//! - [`frontier_exploration`]: frontier detection and selection.
//! - [`exploration`]: strategies and the exploration state machine.
//!
//! Everything here is synchronous and single-owner; a session is driven by
//! calling [`ExplorationStateMachine::update`] once per tick.

pub mod astar;
pub mod error;
pub mod exploration;
pub mod frontier_exploration;
pub mod map;
pub mod slam;

pub use astar::{PathPlanner, PlannerConfig, SearchResult};
pub use error::NavigationError;
pub use exploration::{
    ControllerVariant, ExplorationConfig, ExplorationEvent, ExplorationParams, ExplorationState,
    ExplorationStateMachine, StrategyKind,
};
pub use frontier_exploration::FrontierExploration;
pub use map::{MapConfig, MapType, OccupancyMap};
pub use slam::{PoseGraph, PoseGraphConfig};
