//! Simulated maze and laser sensor.
//!
//! Walls are unit squares built from a character layout. The `S` cell center
//! is the world origin, x grows to the right and y grows upwards, so the
//! first layout row is the top of the maze.

use std::f32::consts::TAU;

use anyhow::{bail, ensure};
use mazebot_geometry::{Pose2D, WorldPoint};
use tracing::debug;

/// A wall edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: WorldPoint,
    pub b: WorldPoint,
}

impl Segment {
    /// Parameter `t` along the ray `origin + t * dir` where it meets this segment.
    fn ray_hit(&self, origin: &WorldPoint, dir: (f32, f32)) -> Option<f32> {
        let (ex, ey) = (self.b.x - self.a.x, self.b.y - self.a.y);
        let denom = cross(dir, (ex, ey));
        if denom.abs() < 1e-9 {
            return None;
        }
        let (wx, wy) = (self.a.x - origin.x, self.a.y - origin.y);
        let t = cross((wx, wy), (ex, ey)) / denom;
        let u = cross((wx, wy), dir) / denom;
        (t >= 0.0 && (0.0..=1.0).contains(&u)).then_some(t)
    }

    /// Whether the segment `from -> to` crosses this one.
    fn crosses(&self, from: &WorldPoint, to: &WorldPoint) -> bool {
        let dir = (to.x - from.x, to.y - from.y);
        self.ray_hit(from, dir).is_some_and(|t| t <= 1.0)
    }
}

fn cross(a: (f32, f32), b: (f32, f32)) -> f32 {
    a.0 * b.1 - a.1 * b.0
}

#[derive(Debug, Clone)]
pub struct Maze {
    walls: Vec<Segment>,
    start: WorldPoint,
    goal: WorldPoint,
    rows: usize,
    cols: usize,
}

impl Maze {
    /// Builds a maze from layout rows, top row first.
    pub fn parse(layout: &[String], cell_size: f32) -> anyhow::Result<Self> {
        ensure!(cell_size > 0.0, "cell size must be positive");
        let cells: Vec<Vec<char>> = layout.iter().map(|row| row.chars().collect()).collect();

        let mut start = None;
        let mut goal = None;
        for (row, line) in cells.iter().enumerate() {
            for (col, &c) in line.iter().enumerate() {
                match c {
                    'S' => start = Some((row, col)),
                    'G' => goal = Some((row, col)),
                    '#' | '.' | ' ' => {}
                    other => bail!("unexpected character {other:?} at row {row}, column {col}"),
                }
            }
        }
        let Some((s_row, s_col)) = start else {
            bail!("layout has no start cell 'S'");
        };
        let Some((g_row, g_col)) = goal else {
            bail!("layout has no goal cell 'G'");
        };

        let center = |row: usize, col: usize| {
            WorldPoint::new(
                (col as f32 - s_col as f32) * cell_size,
                (s_row as f32 - row as f32) * cell_size,
            )
        };

        let half = cell_size / 2.0;
        let mut walls = Vec::new();
        for (row, line) in cells.iter().enumerate() {
            for (col, &c) in line.iter().enumerate() {
                if c != '#' {
                    continue;
                }
                let p = center(row, col);
                let (x0, x1, y0, y1) = (p.x - half, p.x + half, p.y - half, p.y + half);
                walls.extend([
                    Segment { a: WorldPoint::new(x0, y0), b: WorldPoint::new(x1, y0) },
                    Segment { a: WorldPoint::new(x1, y0), b: WorldPoint::new(x1, y1) },
                    Segment { a: WorldPoint::new(x1, y1), b: WorldPoint::new(x0, y1) },
                    Segment { a: WorldPoint::new(x0, y1), b: WorldPoint::new(x0, y0) },
                ]);
            }
        }

        let maze = Maze {
            walls,
            start: center(s_row, s_col),
            goal: center(g_row, g_col),
            rows: cells.len(),
            cols: cells.iter().map(Vec::len).max().unwrap_or(0),
        };
        debug!(rows = maze.rows, cols = maze.cols, segments = maze.walls.len(), goal = %maze.goal, "Maze built");
        Ok(maze)
    }

    pub fn start(&self) -> Pose2D {
        Pose2D::new(self.start.x, self.start.y, 0.0)
    }

    pub fn goal(&self) -> WorldPoint {
        self.goal
    }

    /// Whether moving in a straight line from `from` to `to` passes through a wall.
    pub fn blocks(&self, from: &WorldPoint, to: &WorldPoint) -> bool {
        self.walls.iter().any(|w| w.crosses(from, to))
    }

    /// Applies a commanded pose. A move through a wall only updates the heading.
    pub fn realize_motion(&self, current: &Pose2D, commanded: &Pose2D) -> Pose2D {
        if self.blocks(&current.position(), &commanded.position()) {
            debug!(from = %current, to = %commanded, "Move blocked by wall");
            Pose2D::new(current.x, current.y, commanded.theta)
        } else {
            *commanded
        }
    }
}

/// Ring of evenly spaced range finders.
#[derive(Debug, Clone, Copy)]
pub struct LaserSensor {
    num_rays: usize,
    max_range: f32,
}

impl LaserSensor {
    pub fn new(num_rays: usize, max_range: f32) -> Self {
        LaserSensor { num_rays, max_range }
    }

    /// Nearest wall hit per ray, in the robot frame. Rays that hit nothing in range are dropped.
    pub fn scan(&self, pose: &Pose2D, maze: &Maze) -> Vec<WorldPoint> {
        let origin = pose.position();
        (0..self.num_rays)
            .filter_map(|i| {
                let local = i as f32 * TAU / self.num_rays as f32;
                let bearing = pose.theta + local;
                let dir = (bearing.cos(), bearing.sin());
                let range = maze
                    .walls
                    .iter()
                    .filter_map(|w| w.ray_hit(&origin, dir))
                    .fold(f32::INFINITY, f32::min);
                (range <= self.max_range).then(|| WorldPoint::new(range * local.cos(), range * local.sin()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn corridor() -> Maze {
        let layout = ["#####", "#S.G#", "#####"].map(String::from);
        Maze::parse(&layout, 1.0).unwrap()
    }

    #[test]
    fn test_parse() {
        let maze = corridor();
        assert_eq!(maze.start(), Pose2D::new(0.0, 0.0, 0.0));
        assert_eq!(maze.goal(), WorldPoint::new(2.0, 0.0));
        assert_eq!(maze.walls.len(), 12 * 4);
    }

    #[test]
    fn test_parse_errors() {
        let no_goal = ["###", "#S#", "###"].map(String::from);
        assert!(Maze::parse(&no_goal, 1.0).is_err());
        let bad = ["#S?G#"].map(String::from);
        assert!(Maze::parse(&bad, 1.0).is_err());
    }

    #[test]
    fn test_scan_hits_corridor_walls() {
        let maze = corridor();
        let sensor = LaserSensor::new(4, 5.0);
        let scan = sensor.scan(&Pose2D::new(0.0, 0.0, 0.0), &maze);
        assert_eq!(scan.len(), 4);
        // Ahead: the far wall face at x = 2.5
        assert!((scan[0].x - 2.5).abs() < EPSILON);
        // Left: the top wall face at y = 0.5
        assert!((scan[1].y - 0.5).abs() < EPSILON);
        // Behind: x = -0.5
        assert!((scan[2].x - -0.5).abs() < EPSILON);
    }

    #[test]
    fn test_scan_is_in_robot_frame() {
        let maze = corridor();
        let sensor = LaserSensor::new(4, 5.0);
        // Facing +y, the first ray points at the top wall 0.5 m ahead
        let scan = sensor.scan(&Pose2D::new(0.0, 0.0, std::f32::consts::FRAC_PI_2), &maze);
        assert!((scan[0].x - 0.5).abs() < EPSILON);
        assert!(scan[0].y.abs() < EPSILON);
    }

    #[test]
    fn test_scan_range_limit() {
        let maze = corridor();
        let sensor = LaserSensor::new(4, 1.0);
        let scan = sensor.scan(&Pose2D::new(0.0, 0.0, 0.0), &maze);
        assert_eq!(scan.len(), 3, "The 2.5 m ray ahead is out of range");
    }

    #[test]
    fn test_realize_motion() {
        let maze = corridor();
        let here = Pose2D::new(0.0, 0.0, 0.0);

        let ok = Pose2D::new(0.5, 0.0, 0.3);
        assert_eq!(maze.realize_motion(&here, &ok), ok);

        let through_wall = Pose2D::new(0.0, 1.0, 1.2);
        assert_eq!(maze.realize_motion(&here, &through_wall), Pose2D::new(0.0, 0.0, 1.2));
    }
}
