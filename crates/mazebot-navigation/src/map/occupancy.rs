//! Probabilistic occupancy map with ray-casting updates.
//!
//! Each scan point is transformed into the world frame and marks its cell
//! `Occupied`, pushing the cell probability towards the hit probability. The
//! Bresenham ray from the robot's cell to the hit then clears every cell it
//! crosses that is still `Unknown`, pushing it towards the miss probability.
//! Occupied cells are never cleared by later rays.
//!
//! Both updates use the same Bayesian rule, clamped so no cell ever becomes
//! certain:
//!
//! ```text
//! p' = clamp(p·e / (p·e + (1 − p)·(1 − e)), 0.1, 0.9)
//! ```
//!
//! Next to the grids the map keeps deduplicated point lists (point cloud,
//! obstacles, free space) and owns the [`PoseGraph`] fed with every pose.
//!
//! Grid coordinates follow `cell = floor((world + origin) / resolution)`.
//! Writes outside the grid are silently skipped.

use mazebot_geometry::{GridPoint, Pose2D, WorldPoint};
use tracing::debug;

use super::config::{MapConfig, MapType};
use super::grid::{Grid, GridCell};
use super::point_set::PointSet;
use super::raycast::BresenhamLine;
use crate::slam::{PoseGraph, PoseGraphConfig};

/// Lower clamp of every cell probability.
pub const MIN_PROBABILITY: f32 = 0.1;
/// Upper clamp of every cell probability.
pub const MAX_PROBABILITY: f32 = 0.9;
/// Prior probability of a cell nothing is known about.
pub const UNKNOWN_PROBABILITY: f32 = 0.5;
/// Free space is only sampled along rays longer than this (m).
const MIN_FREE_SPACE_RANGE: f32 = 0.1;

/// Number of grid cells in each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellCounts {
    /// Cells never observed.
    pub unknown: usize,
    /// Cells crossed by a ray.
    pub free: usize,
    /// Cells a ray ended in.
    pub occupied: usize,
}

/// Occupancy grid, probability grid and point-based map of one session.
#[derive(Debug, Clone)]
pub struct OccupancyMap {
    config: MapConfig,
    map_type: MapType,
    occupancy: Grid<GridCell>,
    probability: Grid<f32>,
    point_cloud: PointSet,
    obstacles: PointSet,
    free_space: PointSet,
    trajectory: Vec<Pose2D>,
    pose_graph: PoseGraph,
}

impl OccupancyMap {
    /// Creates a hybrid map with a default pose graph.
    ///
    /// The configuration is taken as given; see [`MapConfig::validate`].
    pub fn new(config: MapConfig) -> Self {
        let width = config.grid_width();
        let height = config.grid_height();
        let spacing = config.resolution * 2.0;
        OccupancyMap {
            config,
            map_type: MapType::default(),
            occupancy: Grid::new(width, height, GridCell::Unknown),
            probability: Grid::new(width, height, UNKNOWN_PROBABILITY),
            point_cloud: PointSet::new(spacing),
            obstacles: PointSet::new(spacing),
            free_space: PointSet::new(spacing),
            trajectory: Vec::new(),
            pose_graph: PoseGraph::default(),
        }
    }

    /// Selects which representations `update` maintains.
    pub fn with_map_type(mut self, map_type: MapType) -> Self {
        self.map_type = map_type;
        self
    }

    /// Replaces the pose graph with an empty one using `config`.
    pub fn with_pose_graph_config(mut self, config: PoseGraphConfig) -> Self {
        self.pose_graph = PoseGraph::new(config);
        self
    }

    /// Folds one local-frame scan taken at `pose` into the map.
    ///
    /// The pose graph always receives the pose. The grids and point lists are
    /// updated according to the map type.
    pub fn update(&mut self, pose: Pose2D, scan: &[WorldPoint]) {
        let node = self.pose_graph.add_pose(pose, scan);
        self.trajectory.push(pose);

        let hits: Vec<WorldPoint> = scan.iter().map(|p| pose.transform_point(p)).collect();
        match self.map_type {
            MapType::OccupancyGrid => self.update_grid(&pose, &hits),
            MapType::PointCloud => self.update_points(&pose, &hits),
            MapType::Hybrid => {
                self.update_grid(&pose, &hits);
                self.update_points(&pose, &hits);
            }
        }

        debug!(
            node,
            x = pose.x,
            y = pose.y,
            theta = pose.theta,
            scan = scan.len(),
            obstacles = self.obstacles.len(),
            "Map updated"
        );
    }

    fn update_grid(&mut self, pose: &Pose2D, hits: &[WorldPoint]) {
        let robot_cell = self.world_to_grid(&pose.position());
        for hit in hits {
            let hit_cell = self.world_to_grid(hit);
            if let Some(cell) = self.occupancy.get_mut(hit_cell) {
                *cell = GridCell::Occupied;
                self.apply_evidence(hit_cell, self.config.hit_probability);
            }

            if !self.occupancy.contains(robot_cell) || !self.occupancy.contains(hit_cell) {
                continue;
            }
            for cell in BresenhamLine::new(robot_cell, hit_cell).filter(|c| *c != hit_cell) {
                if self.occupancy.get(cell) == Some(&GridCell::Unknown) {
                    if let Some(state) = self.occupancy.get_mut(cell) {
                        *state = GridCell::Free;
                    }
                    self.apply_evidence(cell, self.config.miss_probability);
                }
            }
        }
    }

    fn apply_evidence(&mut self, cell: GridPoint, evidence: f32) {
        if let Some(p) = self.probability.get_mut(cell) {
            *p = bayes_update(*p, evidence);
        }
    }

    fn update_points(&mut self, pose: &Pose2D, hits: &[WorldPoint]) {
        let robot = pose.position();
        for hit in hits {
            if self.point_cloud.insert(*hit) {
                self.obstacles.insert(*hit);
            }

            let range = robot.distance_to(hit);
            if range > MIN_FREE_SPACE_RANGE {
                let steps = (range / self.config.resolution) as usize;
                for i in 1..steps {
                    let t = i as f32 / steps as f32;
                    self.free_space.insert(WorldPoint::new(
                        robot.x + (hit.x - robot.x) * t,
                        robot.y + (hit.y - robot.y) * t,
                    ));
                }
            }
        }
    }

    /// Adds a known obstacle directly, subject to the usual spacing rule.
    ///
    /// # Returns
    ///
    /// `true` if the point was stored.
    pub fn add_obstacle_point(&mut self, point: WorldPoint) -> bool {
        self.obstacles.insert(point)
    }

    /// Converts a world point to the cell containing it. The cell may lie outside the grid.
    pub fn world_to_grid(&self, point: &WorldPoint) -> GridPoint {
        let res = self.config.resolution;
        GridPoint::new(
            ((point.x + self.config.origin.x) / res).floor() as i32,
            ((point.y + self.config.origin.y) / res).floor() as i32,
        )
    }

    /// Converts a cell to the world position of its minimum corner.
    pub fn grid_to_world(&self, cell: &GridPoint) -> WorldPoint {
        let res = self.config.resolution;
        WorldPoint::new(
            cell.x as f32 * res - self.config.origin.x,
            cell.y as f32 * res - self.config.origin.y,
        )
    }

    /// Returns `true` if `point` falls inside the grid.
    pub fn is_within_bounds(&self, point: &WorldPoint) -> bool {
        self.occupancy.contains(self.world_to_grid(point))
    }

    /// Returns `true` if a known obstacle point lies strictly within `radius` of `point`.
    pub fn is_near_obstacle(&self, point: &WorldPoint, radius: f32) -> bool {
        self.obstacles.any_within(point, radius)
    }

    /// State of a single cell, or `None` outside the grid.
    pub fn cell(&self, cell: GridPoint) -> Option<GridCell> {
        self.occupancy.get(cell).copied()
    }

    /// Probability of a single cell, or `None` outside the grid.
    pub fn probability(&self, cell: GridPoint) -> Option<f32> {
        self.probability.get(cell).copied()
    }

    /// Copy of the occupancy grid.
    pub fn occupancy_grid(&self) -> Grid<GridCell> {
        self.occupancy.clone()
    }

    /// Copy of the probability grid.
    pub fn probability_grid(&self) -> Grid<f32> {
        self.probability.clone()
    }

    /// Copy of the point cloud.
    pub fn point_cloud(&self) -> Vec<WorldPoint> {
        self.point_cloud.to_vec()
    }

    /// Copy of the obstacle points.
    pub fn obstacle_points(&self) -> Vec<WorldPoint> {
        self.obstacles.to_vec()
    }

    /// Copy of the free-space points.
    pub fn free_space_points(&self) -> Vec<WorldPoint> {
        self.free_space.to_vec()
    }

    pub(crate) fn obstacles(&self) -> &[WorldPoint] {
        self.obstacles.as_slice()
    }

    pub(crate) fn free_space(&self) -> &[WorldPoint] {
        self.free_space.as_slice()
    }

    /// Every pose passed to `update`, in order.
    pub fn robot_trajectory(&self) -> Vec<Pose2D> {
        self.trajectory.clone()
    }

    /// The trajectory after pose-graph optimization.
    pub fn optimized_trajectory(&self) -> Vec<WorldPoint> {
        self.pose_graph.optimized_trajectory()
    }

    /// The pose graph owned by this map.
    pub fn pose_graph(&self) -> &PoseGraph {
        &self.pose_graph
    }

    /// The map configuration.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Which representations `update` maintains.
    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    /// Number of cells in each state.
    pub fn cell_counts(&self) -> CellCounts {
        self.occupancy
            .as_slice()
            .iter()
            .fold(CellCounts::default(), |mut counts, cell| {
                match cell {
                    GridCell::Unknown => counts.unknown += 1,
                    GridCell::Free => counts.free += 1,
                    GridCell::Occupied => counts.occupied += 1,
                }
                counts
            })
    }

    /// Fraction of cells that are no longer `Unknown`.
    pub fn explored_ratio(&self) -> f32 {
        if self.occupancy.is_empty() {
            return 0.0;
        }
        let counts = self.cell_counts();
        (counts.free + counts.occupied) as f32 / self.occupancy.len() as f32
    }

    /// Resets grids to unknown and empties every list and the pose graph.
    pub fn clear(&mut self) {
        self.occupancy.fill(GridCell::Unknown);
        self.probability.fill(UNKNOWN_PROBABILITY);
        self.point_cloud.clear();
        self.obstacles.clear();
        self.free_space.clear();
        self.trajectory.clear();
        self.pose_graph.clear();
    }

    /// Multi-line summary of the map.
    pub fn statistics(&self) -> String {
        let counts = self.cell_counts();
        format!(
            "grid: {}x{}\nresolution: {} m/cell\nunknown: {}\nfree: {}\noccupied: {}\npoint cloud: {}\ntrajectory: {}\npose graph: {}",
            self.occupancy.width(),
            self.occupancy.height(),
            self.config.resolution,
            counts.unknown,
            counts.free,
            counts.occupied,
            self.point_cloud.len(),
            self.trajectory.len(),
            self.pose_graph.statistics()
        )
    }
}

/// Bayesian occupancy update of `prior` with `evidence`, clamped to
/// `[MIN_PROBABILITY, MAX_PROBABILITY]`.
pub fn bayes_update(prior: f32, evidence: f32) -> f32 {
    let num = prior * evidence;
    let p = num / (num + (1.0 - prior) * (1.0 - evidence));
    p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    // 40x40 cells at 0.1m, world (-2, -2) is the corner of cell [0, 0]
    fn small_config() -> MapConfig {
        MapConfig {
            resolution: 0.1,
            width: 4.0,
            height: 4.0,
            origin: WorldPoint::new(2.0, 2.0),
            max_range: 5.0,
            hit_probability: 0.7,
            miss_probability: 0.3,
        }
    }

    fn robot() -> Pose2D {
        Pose2D::new(0.05, 0.05, 0.0)
    }

    #[test]
    fn test_map_creation() {
        let map = OccupancyMap::new(small_config());
        let grid = map.occupancy_grid();
        assert_eq!((grid.width(), grid.height()), (40, 40));
        assert!(grid.iter().all(|(_, c)| *c == GridCell::Unknown));
        assert!(map.probability_grid().iter().all(|(_, p)| (*p - 0.5).abs() < EPSILON));
        assert_eq!(map.map_type(), MapType::Hybrid);
    }

    #[test]
    fn test_coordinate_conversion() {
        let map = OccupancyMap::new(small_config());
        assert_eq!(map.world_to_grid(&WorldPoint::new(0.05, 0.05)), GridPoint::new(20, 20));
        assert_eq!(map.world_to_grid(&WorldPoint::new(-2.05, 0.05)), GridPoint::new(-1, 20));

        let corner = map.grid_to_world(&GridPoint::new(25, 5));
        assert!((corner.x - 0.5).abs() < EPSILON);
        assert!((corner.y - -1.5).abs() < EPSILON);

        assert!(map.is_within_bounds(&WorldPoint::new(1.95, -1.95)));
        assert!(!map.is_within_bounds(&WorldPoint::new(2.05, 0.0)));
        assert!(!map.is_within_bounds(&WorldPoint::new(0.0, -2.05)));
    }

    #[test]
    fn test_update_marks_hit_and_ray() {
        let mut map = OccupancyMap::new(small_config());
        map.update(robot(), &[WorldPoint::new(1.04, 0.0)]);

        assert_eq!(map.cell(GridPoint::new(30, 20)), Some(GridCell::Occupied));
        assert!((map.probability(GridPoint::new(30, 20)).unwrap() - 0.7).abs() < EPSILON);
        for x in 20..30 {
            assert_eq!(map.cell(GridPoint::new(x, 20)), Some(GridCell::Free), "cell {x}");
            assert!((map.probability(GridPoint::new(x, 20)).unwrap() - 0.3).abs() < EPSILON);
        }
        assert_eq!(map.cell(GridPoint::new(31, 20)), Some(GridCell::Unknown));

        let counts = map.cell_counts();
        assert_eq!(counts, CellCounts { unknown: 1600 - 11, free: 10, occupied: 1 });
        assert!((map.explored_ratio() - 11.0 / 1600.0).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_hits_saturate() {
        let mut map = OccupancyMap::new(small_config());
        let scan = [WorldPoint::new(1.04, 0.0)];
        map.update(robot(), &scan);
        map.update(robot(), &scan);
        // 0.7·0.7 / (0.49 + 0.09)
        assert!((map.probability(GridPoint::new(30, 20)).unwrap() - 0.8448).abs() < EPSILON);
        // Free cells only take evidence while Unknown
        assert!((map.probability(GridPoint::new(25, 20)).unwrap() - 0.3).abs() < EPSILON);

        map.update(robot(), &scan);
        assert!((map.probability(GridPoint::new(30, 20)).unwrap() - 0.9).abs() < EPSILON);
    }

    #[test]
    fn test_occupied_cells_are_sticky() {
        let mut map = OccupancyMap::new(small_config());
        map.update(robot(), &[WorldPoint::new(1.04, 0.0)]);
        let before = map.occupancy_grid();

        map.update(robot(), &[WorldPoint::new(1.04, 0.0)]);
        assert_eq!(map.occupancy_grid(), before);

        // A longer ray through the occupied cell
        map.update(robot(), &[WorldPoint::new(1.54, 0.0)]);
        assert_eq!(map.cell(GridPoint::new(30, 20)), Some(GridCell::Occupied));
        assert_eq!(map.cell(GridPoint::new(35, 20)), Some(GridCell::Occupied));
        assert_eq!(map.cell(GridPoint::new(33, 20)), Some(GridCell::Free));
    }

    #[test]
    fn test_probability_bounds() {
        let mut map = OccupancyMap::new(small_config());
        let scan: Vec<WorldPoint> = (0..36)
            .map(|i| {
                let a = i as f32 * 10f32.to_radians();
                WorldPoint::new(1.5 * a.cos(), 1.5 * a.sin())
            })
            .collect();
        for i in 0..20 {
            let pose = Pose2D::new(0.05 + (i % 5) as f32 * 0.1, 0.05, i as f32 * 0.2);
            map.update(pose, &scan);
        }
        assert!(
            map.probability_grid()
                .iter()
                .all(|(_, p)| (MIN_PROBABILITY..=MAX_PROBABILITY).contains(p))
        );
    }

    #[test]
    fn test_out_of_bounds_hit_is_ignored() {
        let mut map = OccupancyMap::new(small_config());
        map.update(robot(), &[WorldPoint::new(3.0, 0.0)]);
        let counts = map.cell_counts();
        assert_eq!(counts.occupied, 0);
        // The whole ray is skipped when its end is outside
        assert_eq!(counts.free, 0);
        // The point lists do not depend on the grid
        assert_eq!(map.obstacle_points().len(), 1);
    }

    #[test]
    fn test_point_cloud_mode() {
        let mut map = OccupancyMap::new(small_config()).with_map_type(MapType::PointCloud);
        map.update(robot(), &[WorldPoint::new(1.0, 0.0), WorldPoint::new(1.0, 0.1)]);

        assert_eq!(map.cell_counts().occupied, 0);
        // Second hit is within 2·resolution of the first
        assert_eq!(map.point_cloud().len(), 1);
        assert_eq!(map.obstacle_points().len(), 1);
        // Samples every 0.1m, deduplicated at 0.2m
        let free = map.free_space_points();
        assert!(!free.is_empty());
        assert!(free.iter().all(|p| p.x > 0.05 && p.x < 1.05));
        assert_eq!(map.pose_graph().node_count(), 1);
    }

    #[test]
    fn test_grid_mode_skips_points() {
        let mut map = OccupancyMap::new(small_config()).with_map_type(MapType::OccupancyGrid);
        map.update(robot(), &[WorldPoint::new(1.04, 0.0)]);
        assert_eq!(map.cell_counts().occupied, 1);
        assert!(map.obstacle_points().is_empty());
        assert!(map.free_space_points().is_empty());
    }

    #[test]
    fn test_obstacle_dedup() {
        let mut map = OccupancyMap::new(MapConfig {
            resolution: 0.05,
            ..small_config()
        });
        for _ in 0..100 {
            map.add_obstacle_point(WorldPoint::new(1.0, 1.0));
        }
        assert_eq!(map.obstacle_points().len(), 1);
        assert!(map.is_near_obstacle(&WorldPoint::new(1.1, 1.0), 0.2));
        assert!(!map.is_near_obstacle(&WorldPoint::new(1.3, 1.0), 0.2));
    }

    #[test]
    fn test_trajectory_and_clear() {
        let mut map = OccupancyMap::new(small_config());
        map.update(robot(), &[WorldPoint::new(1.04, 0.0)]);
        map.update(Pose2D::new(0.75, 0.05, 0.0), &[WorldPoint::new(0.5, 0.0)]);
        assert_eq!(map.robot_trajectory().len(), 2);
        assert_eq!(map.optimized_trajectory().len(), 2);

        map.clear();
        assert_eq!(map.cell_counts().unknown, 1600);
        assert!(map.probability_grid().iter().all(|(_, p)| (*p - 0.5).abs() < EPSILON));
        assert!(map.obstacle_points().is_empty());
        assert!(map.free_space_points().is_empty());
        assert!(map.robot_trajectory().is_empty());
        assert_eq!(map.pose_graph().node_count(), 0);
    }

    #[test]
    fn test_statistics() {
        let mut map = OccupancyMap::new(small_config());
        map.update(robot(), &[WorldPoint::new(1.04, 0.0)]);
        let stats = map.statistics();
        assert!(stats.starts_with("grid: 40x40\n"));
        assert!(stats.contains("occupied: 1\n"));
        assert!(stats.contains("pose graph: nodes: 1"));
    }

    #[test]
    fn test_bayes_update() {
        assert!((bayes_update(0.5, 0.7) - 0.7).abs() < EPSILON);
        assert!((bayes_update(0.5, 0.3) - 0.3).abs() < EPSILON);
        assert!((bayes_update(0.1, 0.3) - 0.1).abs() < EPSILON);
        assert!((bayes_update(0.9, 0.99) - 0.9).abs() < EPSILON);
    }
}
