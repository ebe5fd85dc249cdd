//! Exploration states and the events emitted while moving between them.

use std::fmt;

use mazebot_geometry::Pose2D;

use crate::map::CellCounts;

/// Phase of an exploration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExplorationState {
    /// Waiting for the first tick after `start`.
    Initialization,
    /// Mapping the maze with the active strategy.
    Exploration,
    /// Trying to plan a path to the goal.
    SearchGoal,
    /// Following the goal path.
    NavigateToGoal,
    /// Planning the way back to the start.
    PathPlanning,
    /// Following the return path.
    Navigation,
    /// Terminal.
    Completed,
}

impl fmt::Display for ExplorationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExplorationState::Initialization => "Initialization",
            ExplorationState::Exploration => "Exploration",
            ExplorationState::SearchGoal => "SearchGoal",
            ExplorationState::NavigateToGoal => "NavigateToGoal",
            ExplorationState::PathPlanning => "PathPlanning",
            ExplorationState::Navigation => "Navigation",
            ExplorationState::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// Owned snapshot of the map sent with [`ExplorationEvent::MapUpdated`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapSummary {
    /// Tick that produced the update.
    pub step: u64,
    /// Grid cells per state.
    pub cells: CellCounts,
    /// Fraction of grid cells no longer unknown.
    pub explored_ratio: f32,
    /// Obstacle points in the map.
    pub obstacle_points: usize,
    /// Free-space points in the map.
    pub free_space_points: usize,
    /// Keyframes in the pose graph.
    pub keyframes: usize,
    /// Loop closures in the pose graph.
    pub loop_closures: usize,
}

/// Notification delivered to subscribers of an exploration session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExplorationEvent {
    /// The session entered a new state.
    StateChanged(ExplorationState),
    /// Human-readable status line.
    Status(String),
    /// Progress in percent, `0..=100`.
    Progress(f32),
    /// The map absorbed a new scan.
    MapUpdated(MapSummary),
    /// The pose the session is working from this tick.
    PoseChanged(Pose2D),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ExplorationState::NavigateToGoal.to_string(), "NavigateToGoal");
        assert_eq!(ExplorationState::Completed.to_string(), "Completed");
    }
}
