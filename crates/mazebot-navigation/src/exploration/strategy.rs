//! Exploration strategies.
//!
//! A strategy looks at the current pose, the frontier list and the map and
//! proposes one [`Action`]. It never touches the map or the session state
//! itself; the state machine applies the action.

use std::f32::consts::{FRAC_PI_2, TAU};

use mazebot_geometry::{Pose2D, WorldPoint, normalize_angle};
use rand::{Rng, RngCore};
use tracing::debug;

use crate::astar::{PathPlanner, PlannerConfig};
use crate::frontier_exploration::FrontierExploration;
use crate::map::OccupancyMap;

use super::config::ExplorationParams;

/// What a strategy wants the robot to do this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Stay put.
    Hold,
    /// Rotate in place to the given heading.
    Turn {
        /// New heading (rad).
        theta: f32,
    },
    /// Jump to the given pose.
    MoveTo(Pose2D),
    /// Follow these waypoints, one per tick.
    FollowPath(Vec<WorldPoint>),
}

/// A way of choosing the next move while exploring.
pub trait ExplorationStrategy: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Proposes the next move from `pose`.
    fn decide(
        &mut self,
        pose: &Pose2D,
        frontiers: &[WorldPoint],
        map: &OccupancyMap,
        rng: &mut dyn RngCore,
    ) -> Action;
}

/// Selects which strategy a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyKind {
    /// Plan to the closest frontier.
    FrontierBased,
    /// Random safe steps.
    RandomWalk,
    /// Keep a wall on the right.
    WallFollowing,
    /// Frontiers while any exist and are reachable, otherwise wall following.
    #[default]
    Hybrid,
}

impl StrategyKind {
    /// Builds the strategy with the given tuning.
    pub fn build(self, params: &ExplorationParams, planner: PlannerConfig, max_range: f32) -> Box<dyn ExplorationStrategy> {
        match self {
            StrategyKind::FrontierBased => Box::new(FrontierBased::new(planner)),
            StrategyKind::RandomWalk => Box::new(RandomWalk::new(params)),
            StrategyKind::WallFollowing => Box::new(WallFollowing::new(params, planner.resolution, max_range)),
            StrategyKind::Hybrid => Box::new(Hybrid::new(params, planner, max_range)),
        }
    }
}

/// Plans to the frontier closest to the robot.
#[derive(Debug, Clone, Default)]
pub struct FrontierBased {
    planner: PathPlanner,
}

impl FrontierBased {
    /// Creates the strategy with its own planner on the given grid.
    pub fn new(planner: PlannerConfig) -> Self {
        FrontierBased {
            planner: PathPlanner::new(planner),
        }
    }
}

impl ExplorationStrategy for FrontierBased {
    fn name(&self) -> &'static str {
        "frontier"
    }

    fn decide(&mut self, pose: &Pose2D, frontiers: &[WorldPoint], map: &OccupancyMap, _rng: &mut dyn RngCore) -> Action {
        let position = pose.position();
        let Some(target) = FrontierExploration::select_closest_frontier(frontiers, position) else {
            return Action::Hold;
        };
        if !self.planner.plan_path(position, target, map) {
            debug!(%target, "Frontier unreachable");
            return Action::Hold;
        }

        let mut path = self.planner.path();
        // The first waypoint is the corner of the cell the robot already occupies
        if path
            .first()
            .is_some_and(|p| self.planner.world_to_grid(p) == self.planner.world_to_grid(&position))
        {
            path.remove(0);
        }
        if path.is_empty() {
            Action::Hold
        } else {
            Action::FollowPath(path)
        }
    }
}

/// Takes a step of fixed length in a uniformly random direction.
#[derive(Debug, Clone, Copy)]
pub struct RandomWalk {
    step: f32,
    safety_distance: f32,
}

impl RandomWalk {
    /// Uses the random-walk step and safety distance from `params`.
    pub fn new(params: &ExplorationParams) -> Self {
        RandomWalk {
            step: params.random_walk_step,
            safety_distance: params.safety_distance,
        }
    }
}

impl ExplorationStrategy for RandomWalk {
    fn name(&self) -> &'static str {
        "random walk"
    }

    fn decide(&mut self, pose: &Pose2D, _frontiers: &[WorldPoint], map: &OccupancyMap, rng: &mut dyn RngCore) -> Action {
        let angle = rng.random_range(0.0..TAU);
        let target = WorldPoint::new(pose.x + self.step * angle.cos(), pose.y + self.step * angle.sin());
        if map.is_near_obstacle(&target, self.safety_distance) {
            Action::Hold
        } else {
            Action::MoveTo(Pose2D::new(target.x, target.y, normalize_angle(angle)))
        }
    }
}

/// Keeps a wall at a fixed clearance on the robot's right.
///
/// Clearance is measured along the ray pointing right of the heading: the
/// nearest obstacle point within one probe width of that ray, up to the
/// sensor range.
#[derive(Debug, Clone, Copy)]
pub struct WallFollowing {
    clearance: f32,
    step: f32,
    gain: f32,
    max_turn: f32,
    safety_distance: f32,
    probe_width: f32,
    max_range: f32,
}

impl WallFollowing {
    /// Uses the wall-following tuning from `params`; `probe_width` is the clearance ray half-width.
    pub fn new(params: &ExplorationParams, probe_width: f32, max_range: f32) -> Self {
        WallFollowing {
            clearance: params.wall_clearance,
            step: params.wall_follow_step,
            gain: params.wall_turn_gain,
            max_turn: params.wall_max_turn,
            safety_distance: params.safety_distance,
            probe_width,
            max_range,
        }
    }

    /// Distance to the nearest obstacle on the right, capped at the sensor range.
    pub fn right_clearance(&self, pose: &Pose2D, obstacles: &[WorldPoint]) -> f32 {
        let bearing = pose.theta - FRAC_PI_2;
        let (dx, dy) = (bearing.cos(), bearing.sin());
        obstacles
            .iter()
            .filter_map(|o| {
                let (vx, vy) = (o.x - pose.x, o.y - pose.y);
                let along = vx * dx + vy * dy;
                let lateral = (vx * dy - vy * dx).abs();
                (along > 0.0 && along <= self.max_range && lateral <= self.probe_width).then_some(along)
            })
            .fold(self.max_range, f32::min)
    }
}

impl ExplorationStrategy for WallFollowing {
    fn name(&self) -> &'static str {
        "wall following"
    }

    fn decide(&mut self, pose: &Pose2D, _frontiers: &[WorldPoint], map: &OccupancyMap, _rng: &mut dyn RngCore) -> Action {
        let measured = self.right_clearance(pose, map.obstacles());
        let turn = (self.gain * (self.clearance - measured)).clamp(-self.max_turn, self.max_turn);
        let theta = normalize_angle(pose.theta + turn);
        let target = WorldPoint::new(pose.x + self.step * theta.cos(), pose.y + self.step * theta.sin());

        if map.is_near_obstacle(&target, self.safety_distance) {
            // Blocked ahead: turn away from the wall
            Action::Turn {
                theta: normalize_angle(pose.theta + self.max_turn),
            }
        } else {
            Action::MoveTo(Pose2D::new(target.x, target.y, theta))
        }
    }
}

/// Frontier planning with wall following as the fallback.
#[derive(Debug, Clone)]
pub struct Hybrid {
    frontier: FrontierBased,
    wall: WallFollowing,
}

impl Hybrid {
    /// Builds both the frontier planner and the wall follower.
    pub fn new(params: &ExplorationParams, planner: PlannerConfig, max_range: f32) -> Self {
        Hybrid {
            frontier: FrontierBased::new(planner),
            wall: WallFollowing::new(params, planner.resolution, max_range),
        }
    }
}

impl ExplorationStrategy for Hybrid {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn decide(&mut self, pose: &Pose2D, frontiers: &[WorldPoint], map: &OccupancyMap, rng: &mut dyn RngCore) -> Action {
        if !frontiers.is_empty() {
            match self.frontier.decide(pose, frontiers, map, rng) {
                Action::Hold => {}
                action => return action,
            }
        }
        self.wall.decide(pose, frontiers, map, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPSILON: f32 = 1e-4;

    fn map() -> OccupancyMap {
        OccupancyMap::new(MapConfig {
            resolution: 0.05,
            width: 20.0,
            height: 20.0,
            origin: WorldPoint::new(10.0, 10.0),
            max_range: 5.0,
            hit_probability: 0.7,
            miss_probability: 0.3,
        })
    }

    /// Obstacle points along the line `y = wall_y`, 0.15 m apart.
    fn with_wall(wall_y: f32) -> OccupancyMap {
        let mut m = map();
        for i in -13..=13 {
            m.add_obstacle_point(WorldPoint::new(i as f32 * 0.15, wall_y));
        }
        m
    }

    #[test]
    fn test_right_clearance() {
        let wall = WallFollowing::new(&ExplorationParams::default(), 0.1, 5.0);
        let m = with_wall(-0.3);
        let obstacles = m.obstacle_points();

        // Facing +x, right is -y
        assert!((wall.right_clearance(&Pose2D::new(0.0, 0.0, 0.0), &obstacles) - 0.3).abs() < EPSILON);
        // Facing -x, right is +y where nothing is
        assert!((wall.right_clearance(&Pose2D::new(0.0, 0.0, std::f32::consts::PI), &obstacles) - 5.0).abs() < EPSILON);
        assert!((wall.right_clearance(&Pose2D::default(), &[]) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_wall_following_reads_map_obstacles() {
        let wall = WallFollowing::new(&ExplorationParams::default(), 0.1, 5.0);
        let m = with_wall(-0.7);
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let borrowed = wall.right_clearance(&pose, m.obstacles());
        assert!((borrowed - 0.7).abs() < EPSILON);
        assert_eq!(borrowed, wall.right_clearance(&pose, &m.obstacle_points()));
    }

    #[test]
    fn test_wall_following_holds_course_at_clearance() {
        let mut wall = WallFollowing::new(&ExplorationParams::default(), 0.1, 5.0);
        let m = with_wall(-0.3);
        let mut rng = StdRng::seed_from_u64(1);

        match wall.decide(&Pose2D::new(0.0, 0.0, 0.0), &[], &m, &mut rng) {
            Action::MoveTo(p) => {
                assert!(p.theta.abs() < EPSILON);
                assert!((p.x - 0.2).abs() < EPSILON);
                assert!(p.y.abs() < EPSILON);
            }
            other => panic!("Expected a move, got {other:?}"),
        }
    }

    #[test]
    fn test_wall_following_turns_towards_distant_wall() {
        let mut wall = WallFollowing::new(&ExplorationParams::default(), 0.1, 5.0);
        let m = with_wall(-1.0);
        let mut rng = StdRng::seed_from_u64(1);

        // 0.5 * (0.3 - 1.0) is clamped to the 0.1 rad turn limit
        match wall.decide(&Pose2D::new(0.0, 0.0, 0.0), &[], &m, &mut rng) {
            Action::MoveTo(p) => assert!((p.theta - -0.1).abs() < EPSILON),
            other => panic!("Expected a move, got {other:?}"),
        }
    }

    #[test]
    fn test_wall_following_turns_when_blocked() {
        let mut wall = WallFollowing::new(&ExplorationParams::default(), 0.1, 5.0);
        let mut m = map();
        m.add_obstacle_point(WorldPoint::new(0.25, 0.0));
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            wall.decide(&Pose2D::new(0.0, 0.0, 0.0), &[], &m, &mut rng),
            Action::Turn { theta: 0.1 }
        );
    }

    #[test]
    fn test_random_walk_steps_are_safe() {
        let mut walk = RandomWalk::new(&ExplorationParams::default());
        let m = with_wall(-0.3);
        let mut rng = StdRng::seed_from_u64(42);
        let pose = Pose2D::new(0.0, 0.0, 0.0);

        for _ in 0..50 {
            match walk.decide(&pose, &[], &m, &mut rng) {
                Action::MoveTo(p) => {
                    assert!((pose.distance_to(&p) - 0.5).abs() < EPSILON);
                    assert!(!m.is_near_obstacle(&p.position(), 0.2));
                }
                Action::Hold => {}
                other => panic!("Unexpected action {other:?}"),
            }
        }
    }

    #[test]
    fn test_random_walk_is_seeded() {
        let m = map();
        let pose = Pose2D::default();
        let mut a = RandomWalk::new(&ExplorationParams::default());
        let mut b = RandomWalk::new(&ExplorationParams::default());
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);

        for _ in 0..10 {
            assert_eq!(a.decide(&pose, &[], &m, &mut rng_a), b.decide(&pose, &[], &m, &mut rng_b));
        }
    }

    #[test]
    fn test_frontier_based_follows_path_to_closest() {
        let mut strategy = FrontierBased::new(PlannerConfig::default());
        let m = map();
        let frontiers = [WorldPoint::new(1.05, 0.05), WorldPoint::new(-3.05, 0.05)];
        let mut rng = StdRng::seed_from_u64(1);

        match strategy.decide(&Pose2D::new(0.05, 0.05, 0.0), &frontiers, &m, &mut rng) {
            Action::FollowPath(path) => {
                assert_eq!(path.len(), 10, "Ten cells east, start cell dropped");
                let last = path[path.len() - 1];
                assert!(last.distance_to(&frontiers[0]) < 0.1);
            }
            other => panic!("Expected a path, got {other:?}"),
        }
    }

    #[test]
    fn test_frontier_based_holds_without_frontiers() {
        let mut strategy = FrontierBased::new(PlannerConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(strategy.decide(&Pose2D::default(), &[], &map(), &mut rng), Action::Hold);
    }

    #[test]
    fn test_hybrid_falls_back_to_wall_following() {
        let params = ExplorationParams::default();
        let mut hybrid = Hybrid::new(&params, PlannerConfig::default(), 5.0);
        let m = with_wall(-0.3);
        let mut rng = StdRng::seed_from_u64(1);
        let pose = Pose2D::new(0.0, 0.0, 0.0);

        // No frontiers
        assert!(matches!(hybrid.decide(&pose, &[], &m, &mut rng), Action::MoveTo(_)));

        // Unreachable frontier: outside the planning area
        let far = [WorldPoint::new(50.0, 0.0)];
        assert!(matches!(hybrid.decide(&pose, &far, &m, &mut rng), Action::MoveTo(_)));

        // Reachable frontier
        let near = [WorldPoint::new(1.05, 0.55)];
        assert!(matches!(hybrid.decide(&pose, &near, &m, &mut rng), Action::FollowPath(_)));
    }
}
