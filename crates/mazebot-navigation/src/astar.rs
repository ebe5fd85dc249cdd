//! A* path planning over a grid rasterized from known obstacle points.
//!
//! ```text
//! f(n) = g(n) + h(n)
//!
//!     g(n) = Euclidean length of the best known path from start to n
//!     h(n) = straight-line distance from n to the goal
//! ```
//!
//! Neighbors are 8-connected and every step costs the exact distance between
//! cell corners, so the straight-line heuristic is consistent and a closed
//! cell never needs reopening.
//!
//! The open set is a plain list. Each pop scans it for the smallest `f` and
//! takes the first one found on ties, so the same inputs always yield the same
//! path.

use std::fmt;

use mazebot_geometry::{GridPoint, WorldPoint};
use tracing::{debug, warn};

use crate::error::NavigationError;
use crate::map::{Grid, OccupancyMap, config::cells_along};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Neighbor visiting order.
const NEIGHBORS: [(i32, i32); 8] = [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

/// Geometry and tolerances of the planning grid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlannerConfig {
    /// Cell edge length (m/cell).
    pub resolution: f32,
    /// Planning area along x (m).
    pub width: f32,
    /// Planning area along y (m).
    pub height: f32,
    /// World-to-grid offset (m).
    pub origin: WorldPoint,
    /// Start and goal must be at least this far from every obstacle point (m).
    pub safety_distance: f32,
    /// Collinearity tolerance of [`PathPlanner::simplify_path`] (m).
    pub simplify_tolerance: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            resolution: 0.1,
            width: 20.0,
            height: 20.0,
            origin: WorldPoint::new(10.0, 10.0),
            safety_distance: 0.2,
            simplify_tolerance: 0.1,
        }
    }
}

impl PlannerConfig {
    /// Checks the planning grid geometry.
    ///
    /// # Errors
    ///
    /// * `InvalidResolution` if `resolution` is not strictly positive.
    /// * `InvalidDimensions` if `width` or `height` is not strictly positive.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if !(self.resolution > 0.0) {
            return Err(NavigationError::InvalidResolution("planner resolution must be positive"));
        }
        if !(self.width > 0.0) || !(self.height > 0.0) {
            return Err(NavigationError::InvalidDimensions(
                "planner width and height must be positive",
            ));
        }
        Ok(())
    }
}

/// Outcome of a single grid search, with metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchResult {
    /// Cells from start to goal inclusive, if the goal was reached.
    pub path: Option<Vec<GridPoint>>,
    /// Length of the path in meters.
    pub total_cost: Option<f32>,
    /// Number of cells expanded.
    pub nodes_explored: usize,
}

impl SearchResult {
    /// Creates a result for a successful search.
    pub fn success(path: Vec<GridPoint>, total_cost: f32, nodes_explored: usize) -> Self {
        SearchResult {
            path: Some(path),
            total_cost: Some(total_cost),
            nodes_explored,
        }
    }

    /// Creates a result for a failed search.
    pub fn failure(nodes_explored: usize) -> Self {
        SearchResult {
            path: None,
            total_cost: None,
            nodes_explored,
        }
    }

    /// Returns true if a path was found.
    pub fn is_success(&self) -> bool {
        self.path.is_some()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(
                f,
                "SearchResult {{ success: true, cells: {}, cost: {:.3}, nodes_explored: {} }}",
                path.len(),
                self.total_cost.unwrap_or(0.0),
                self.nodes_explored
            ),
            None => write!(
                f,
                "SearchResult {{ success: false, nodes_explored: {} }}",
                self.nodes_explored
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Open,
    Closed,
}

/// Runs A* on a grid where `true` marks a blocked cell.
///
/// `cell_size` scales step costs and the heuristic into meters. Start and goal
/// must lie inside the grid; blocked start or goal cells are not rejected
/// here.
pub fn astar_search(blocked: &Grid<bool>, start: GridPoint, goal: GridPoint, cell_size: f32) -> SearchResult {
    if !blocked.contains(start) || !blocked.contains(goal) {
        return SearchResult::failure(0);
    }

    let width = blocked.width();
    let index = |c: GridPoint| c.y as usize * width + c.x as usize;
    let heuristic = |c: GridPoint| {
        let (dx, dy) = ((c.x - goal.x) as f32, (c.y - goal.y) as f32);
        (dx * dx + dy * dy).sqrt() * cell_size
    };

    let mut g = vec![f32::INFINITY; blocked.len()];
    let mut h = vec![0.0_f32; blocked.len()];
    let mut parent: Vec<Option<GridPoint>> = vec![None; blocked.len()];
    let mut visit = vec![Visit::New; blocked.len()];
    let mut open: Vec<GridPoint> = vec![start];

    g[index(start)] = 0.0;
    h[index(start)] = heuristic(start);
    visit[index(start)] = Visit::Open;

    let mut nodes_explored = 0;
    while !open.is_empty() {
        let mut best = 0;
        let mut best_f = f32::INFINITY;
        for (i, c) in open.iter().enumerate() {
            let f = g[index(*c)] + h[index(*c)];
            if f < best_f {
                best_f = f;
                best = i;
            }
        }
        let current = open.remove(best);
        let ci = index(current);
        visit[ci] = Visit::Closed;
        nodes_explored += 1;

        if current == goal {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(prev) = parent[index(cursor)] {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return SearchResult::success(path, g[ci], nodes_explored);
        }

        for (dx, dy) in NEIGHBORS {
            let next = GridPoint::new(current.x + dx, current.y + dy);
            if !matches!(blocked.get(next), Some(false)) {
                continue;
            }
            let ni = index(next);
            if visit[ni] == Visit::Closed {
                continue;
            }

            let step = if dx != 0 && dy != 0 { std::f32::consts::SQRT_2 } else { 1.0 };
            let tentative = g[ci] + step * cell_size;
            match visit[ni] {
                Visit::New => {
                    visit[ni] = Visit::Open;
                    h[ni] = heuristic(next);
                    open.push(next);
                }
                _ if tentative >= g[ni] => continue,
                _ => {}
            }
            g[ni] = tentative;
            parent[ni] = Some(current);
        }
    }

    SearchResult::failure(nodes_explored)
}

/// Sum of the distances between consecutive points.
pub fn path_length(path: &[WorldPoint]) -> f32 {
    path.windows(2).fold(0.0, |acc, w| acc + w[0].distance_to(&w[1]))
}

/// Grid A* planner holding the last planned path.
#[derive(Debug, Clone, Default)]
pub struct PathPlanner {
    config: PlannerConfig,
    path: Vec<WorldPoint>,
    found: bool,
    nodes_explored: usize,
}

impl PathPlanner {
    /// Creates a planner with an empty path.
    pub fn new(config: PlannerConfig) -> Self {
        PathPlanner {
            config,
            ..Default::default()
        }
    }

    /// The planner configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Replaces the planning grid geometry. The current path is kept.
    pub fn set_config(&mut self, config: PlannerConfig) {
        self.config = config;
    }

    /// Plans a path from `start` to `goal` around the map's obstacle points.
    ///
    /// The previous path is always discarded. Planning fails when either
    /// endpoint is outside the planning area or closer than the safety distance
    /// to a known obstacle, or when no path exists. Unknown space is
    /// traversable.
    ///
    /// # Returns
    ///
    /// `true` if a path was found; it is then available from [`PathPlanner::path`].
    pub fn plan_path(&mut self, start: WorldPoint, goal: WorldPoint, map: &OccupancyMap) -> bool {
        self.clear_path();

        if !self.is_position_valid(&start, map) || !self.is_position_valid(&goal, map) {
            debug!(%start, %goal, "Start or goal rejected");
            return false;
        }

        let blocked = self.rasterize(map);
        let start_cell = self.world_to_grid(&start);
        let goal_cell = self.world_to_grid(&goal);
        if !blocked.contains(start_cell) || !blocked.contains(goal_cell) {
            debug!(%start_cell, %goal_cell, "Start or goal outside planning grid");
            return false;
        }

        let result = astar_search(&blocked, start_cell, goal_cell, self.config.resolution);
        self.nodes_explored = result.nodes_explored;
        match result.path {
            Some(cells) => {
                self.path = cells.iter().map(|c| self.grid_to_world(c)).collect();
                self.found = true;
                debug!(
                    waypoints = self.path.len(),
                    length = self.path_length(),
                    nodes_explored = self.nodes_explored,
                    "Path found"
                );
            }
            None => {
                warn!(%start, %goal, nodes_explored = self.nodes_explored, "No path found");
            }
        }
        self.found
    }

    /// Marks every cell that contains a known obstacle point.
    fn rasterize(&self, map: &OccupancyMap) -> Grid<bool> {
        let mut blocked = Grid::new(
            cells_along(self.config.width, self.config.resolution),
            cells_along(self.config.height, self.config.resolution),
            false,
        );
        for obstacle in map.obstacles() {
            if let Some(cell) = blocked.get_mut(self.world_to_grid(obstacle)) {
                *cell = true;
            }
        }
        blocked
    }

    fn is_position_valid(&self, p: &WorldPoint, map: &OccupancyMap) -> bool {
        let c = &self.config;
        let inside = p.x >= -c.origin.x
            && p.x <= c.width - c.origin.x
            && p.y >= -c.origin.y
            && p.y <= c.height - c.origin.y;
        inside && !map.is_near_obstacle(p, c.safety_distance)
    }

    /// Converts a world point to a planning-grid cell.
    pub fn world_to_grid(&self, p: &WorldPoint) -> GridPoint {
        let c = &self.config;
        GridPoint::new(
            ((p.x + c.origin.x) / c.resolution).floor() as i32,
            ((p.y + c.origin.y) / c.resolution).floor() as i32,
        )
    }

    /// Converts a planning-grid cell to its minimum corner in the world.
    pub fn grid_to_world(&self, cell: &GridPoint) -> WorldPoint {
        let c = &self.config;
        WorldPoint::new(
            cell.x as f32 * c.resolution - c.origin.x,
            cell.y as f32 * c.resolution - c.origin.y,
        )
    }

    /// Copy of the last planned path, start first.
    pub fn path(&self) -> Vec<WorldPoint> {
        self.path.clone()
    }

    /// Whether the last call to `plan_path` succeeded.
    pub fn path_found(&self) -> bool {
        self.found
    }

    /// Cells expanded by the last search.
    pub fn nodes_explored(&self) -> usize {
        self.nodes_explored
    }

    /// Length of the current path in meters.
    pub fn path_length(&self) -> f32 {
        path_length(&self.path)
    }

    /// Drops interior waypoints that lie on the line between their neighbors.
    ///
    /// A waypoint is skipped when going through it is less than
    /// `simplify_tolerance` longer than going straight from the last kept
    /// waypoint to the next one. Obstacles are not consulted, so a shortcut can
    /// clip a corner the original path went around.
    pub fn simplify_path(&mut self) {
        if self.path.len() < 3 {
            return;
        }
        let tol = self.config.simplify_tolerance;
        let mut simplified = vec![self.path[0]];
        for i in 1..self.path.len() - 1 {
            let (mid, next) = (self.path[i], self.path[i + 1]);
            let Some(last) = simplified.last() else { continue };
            let detour = last.distance_to(&mid) + mid.distance_to(&next) - last.distance_to(&next);
            if detour.abs() >= tol {
                simplified.push(mid);
            }
        }
        if let Some(&goal) = self.path.last() {
            simplified.push(goal);
        }
        self.path = simplified;
    }

    /// Forgets the current path.
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.found = false;
        self.nodes_explored = 0;
    }

    /// One-line summary of the current path.
    pub fn statistics(&self) -> String {
        format!(
            "waypoints: {}, length: {:.2} m, found: {}",
            self.path.len(),
            self.path_length(),
            self.found
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    const EPSILON: f32 = 1e-3;

    fn empty_map(resolution: f32) -> OccupancyMap {
        OccupancyMap::new(MapConfig {
            resolution,
            width: 2.0,
            height: 2.0,
            origin: WorldPoint::new(1.0, 1.0),
            max_range: 5.0,
            hit_probability: 0.7,
            miss_probability: 0.3,
        })
    }

    /// Plain Dijkstra over the same blocked grid and step costs.
    fn reference_cost(blocked: &Grid<bool>, start: GridPoint, goal: GridPoint, cell_size: f32) -> Option<f32> {
        let width = blocked.width();
        let index = |c: GridPoint| c.y as usize * width + c.x as usize;
        let mut dist = vec![f32::INFINITY; blocked.len()];
        let mut done = vec![false; blocked.len()];
        dist[index(start)] = 0.0;

        loop {
            let next = (0..blocked.len())
                .filter(|&i| !done[i] && dist[i].is_finite())
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]))?;
            done[next] = true;
            let cell = GridPoint::new((next % width) as i32, (next / width) as i32);
            if cell == goal {
                return Some(dist[next]);
            }
            for (dx, dy) in NEIGHBORS {
                let n = GridPoint::new(cell.x + dx, cell.y + dy);
                if blocked.get(n) != Some(&false) {
                    continue;
                }
                let step = if dx != 0 && dy != 0 { std::f32::consts::SQRT_2 } else { 1.0 };
                let cost = dist[next] + step * cell_size;
                if cost < dist[index(n)] {
                    dist[index(n)] = cost;
                }
            }
        }
    }

    #[test]
    fn test_open_field_path() {
        // 20x20m with the origin at the corner, no obstacles
        let mut planner = PathPlanner::new(PlannerConfig {
            origin: WorldPoint::new(0.0, 0.0),
            ..PlannerConfig::default()
        });
        let map = empty_map(0.1);
        let (start, goal) = (WorldPoint::new(1.0, 1.0), WorldPoint::new(13.0, 13.0));

        assert!(planner.plan_path(start, goal, &map), "expected a path in an empty map");
        let path = planner.path();
        assert!(!path.is_empty());

        let first = path[0];
        let last = path[path.len() - 1];
        assert!((first.x - start.x).abs() <= 0.1 + EPSILON && (first.y - start.y).abs() <= 0.1 + EPSILON);
        assert!((last.x - goal.x).abs() <= 0.1 + EPSILON && (last.y - goal.y).abs() <= 0.1 + EPSILON);

        // A straight diagonal
        assert!((planner.path_length() - 12.0 * std::f32::consts::SQRT_2).abs() < 0.05);
        for pair in path.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(planner.path_found());
        assert!(planner.nodes_explored() > 0);
    }

    #[test]
    fn test_enclosed_goal_has_no_path() {
        // Ring of obstacle points at 0.06m spacing, finer than the planner grid
        let mut map = empty_map(0.025);
        let half = 1.05;
        for i in 0..=35 {
            let t = -half + i as f32 * 0.06;
            map.add_obstacle_point(WorldPoint::new(t, -half));
            map.add_obstacle_point(WorldPoint::new(t, half));
            map.add_obstacle_point(WorldPoint::new(-half, t));
            map.add_obstacle_point(WorldPoint::new(half, t));
        }

        let mut planner = PathPlanner::new(PlannerConfig::default());
        let found = planner.plan_path(WorldPoint::new(5.0, 5.0), WorldPoint::new(0.0, 0.0), &map);

        assert!(!found);
        assert!(planner.path().is_empty());
        assert!(!planner.path_found());
        // Search stays within the reachable part of the 200x200 grid
        assert!(planner.nodes_explored() > 0);
        assert!(planner.nodes_explored() <= 200 * 200);
    }

    #[test]
    fn test_rejects_start_near_obstacle() {
        let mut map = empty_map(0.05);
        map.add_obstacle_point(WorldPoint::new(1.1, 1.0));
        let mut planner = PathPlanner::new(PlannerConfig::default());

        assert!(!planner.plan_path(WorldPoint::new(1.0, 1.0), WorldPoint::new(3.0, 3.0), &map));
        assert_eq!(planner.nodes_explored(), 0);
        assert!(planner.plan_path(WorldPoint::new(1.0, 0.7), WorldPoint::new(3.0, 3.0), &map));
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        let map = empty_map(0.05);
        let mut planner = PathPlanner::new(PlannerConfig::default());
        assert!(!planner.plan_path(WorldPoint::new(0.0, 0.0), WorldPoint::new(10.5, 0.0), &map));
        assert!(!planner.plan_path(WorldPoint::new(-10.5, 0.0), WorldPoint::new(1.0, 1.0), &map));
    }

    #[test]
    fn test_failed_plan_clears_previous_path() {
        let map = empty_map(0.05);
        let mut planner = PathPlanner::new(PlannerConfig::default());
        assert!(planner.plan_path(WorldPoint::new(0.0, 0.0), WorldPoint::new(1.0, 0.0), &map));
        assert!(!planner.path().is_empty());

        assert!(!planner.plan_path(WorldPoint::new(0.0, 0.0), WorldPoint::new(50.0, 0.0), &map));
        assert!(planner.path().is_empty());
        assert_eq!(planner.statistics(), "waypoints: 0, length: 0.00 m, found: false");
    }

    #[test]
    fn test_path_matches_reference_cost() {
        let config = PlannerConfig {
            resolution: 0.1,
            width: 3.0,
            height: 3.0,
            origin: WorldPoint::new(0.0, 0.0),
            ..PlannerConfig::default()
        };
        let (start, goal) = (WorldPoint::new(0.25, 0.25), WorldPoint::new(2.75, 2.65));

        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut map = empty_map(0.025);
            for x in 0..30 {
                for y in 0..30 {
                    let center = WorldPoint::new(x as f32 * 0.1 + 0.05, y as f32 * 0.1 + 0.05);
                    if center.distance_to(&start) < 0.4 || center.distance_to(&goal) < 0.4 {
                        continue;
                    }
                    if rng.random_bool(0.3) {
                        map.add_obstacle_point(center);
                    }
                }
            }

            let mut planner = PathPlanner::new(config);
            let found = planner.plan_path(start, goal, &map);
            let blocked = planner.rasterize(&map);
            let reference = reference_cost(
                &blocked,
                planner.world_to_grid(&start),
                planner.world_to_grid(&goal),
                config.resolution,
            );

            assert_eq!(found, reference.is_some(), "seed {seed}: reachability differs");
            if let Some(best) = reference {
                assert!(
                    planner.path_length() <= best + EPSILON,
                    "seed {seed}: {} > {}",
                    planner.path_length(),
                    best
                );
                // Path never enters a blocked cell
                let cells: HashSet<GridPoint> = planner.path().iter().map(|p| planner.world_to_grid(p)).collect();
                assert!(cells.iter().all(|c| blocked.get(*c) == Some(&false)));
            }
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let blocked = Grid::new(12, 12, false);
        let a = astar_search(&blocked, GridPoint::new(0, 0), GridPoint::new(11, 5), 0.1);
        let b = astar_search(&blocked, GridPoint::new(0, 0), GridPoint::new(11, 5), 0.1);
        assert_eq!(a, b);
        assert!(a.is_success());
    }

    #[test]
    fn test_search_walled_off() {
        let mut blocked = Grid::new(5, 5, false);
        for y in 0..5 {
            *blocked.get_mut(GridPoint::new(2, y)).unwrap() = true;
        }
        let result = astar_search(&blocked, GridPoint::new(0, 0), GridPoint::new(4, 4), 1.0);
        assert!(!result.is_success());
        // Only the two free columns left of the wall are reachable
        assert_eq!(result.nodes_explored, 10);
        assert_eq!(result.to_string(), "SearchResult { success: false, nodes_explored: 10 }");
    }

    #[test]
    fn test_simplify_path() {
        let mut planner = PathPlanner::new(PlannerConfig::default());
        planner.path = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(0.1, 0.0),
            WorldPoint::new(0.2, 0.0),
            WorldPoint::new(0.3, 0.0),
            WorldPoint::new(0.3, 0.5),
            WorldPoint::new(0.3, 1.0),
        ];
        planner.simplify_path();
        assert_eq!(
            planner.path(),
            vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(0.3, 0.0), WorldPoint::new(0.3, 1.0)]
        );

        // Fewer than three points are left alone
        planner.path = vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(1.0, 1.0)];
        planner.simplify_path();
        assert_eq!(planner.path().len(), 2);
    }

    #[test]
    fn test_path_length() {
        let path = [WorldPoint::new(0.0, 0.0), WorldPoint::new(3.0, 4.0), WorldPoint::new(3.0, 5.0)];
        assert!((path_length(&path) - 6.0).abs() < EPSILON);
        assert_eq!(path_length(&path[..1]), 0.0);
        assert!(path_length(&[]).is_sign_positive(), "Empty path length must be +0.0");
        assert!(path_length(&path[..1]).is_sign_positive());
    }

    #[test]
    fn test_cleared_path_statistics() {
        let map = empty_map(0.05);
        let mut planner = PathPlanner::new(PlannerConfig::default());
        assert!(planner.plan_path(WorldPoint::new(0.0, 0.0), WorldPoint::new(1.0, 0.0), &map));

        planner.clear_path();
        assert!(planner.path_length().is_sign_positive());
        assert_eq!(planner.statistics(), "waypoints: 0, length: 0.00 m, found: false");
    }

    #[test]
    fn test_config_validation() {
        assert!(PlannerConfig::default().validate().is_ok());
        let bad = PlannerConfig { resolution: -0.1, ..PlannerConfig::default() };
        assert!(matches!(bad.validate(), Err(NavigationError::InvalidResolution(_))));
        let bad = PlannerConfig { width: 0.0, ..PlannerConfig::default() };
        assert!(matches!(bad.validate(), Err(NavigationError::InvalidDimensions(_))));
    }
}
