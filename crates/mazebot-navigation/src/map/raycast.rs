//! Bresenham ray rasterization between grid cells.
//!
//! ```text
//! From [0,0] to [6,3]:
//!
//!     3 │            ●
//!     2 │        ● ●
//!     1 │    ● ●
//!     0 ● ●
//!       └──────────────
//!        0 1 2 3 4 5 6
//! ```
//!
//! Integer-only, every cell on the line is visited exactly once, start and
//! end included.

use mazebot_geometry::GridPoint;

/// Iterator over the grid cells on the line from `start` to `end` inclusive.
#[derive(Debug, Clone)]
pub struct BresenhamLine {
    x: i32,
    y: i32,
    end: GridPoint,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    done: bool,
}

impl BresenhamLine {
    /// Creates a line iterator between two cells.
    pub fn new(start: GridPoint, end: GridPoint) -> Self {
        let dx = (end.x - start.x).abs();
        let dy = (end.y - start.y).abs();
        BresenhamLine {
            x: start.x,
            y: start.y,
            end,
            dx,
            dy,
            sx: if start.x < end.x { 1 } else { -1 },
            sy: if start.y < end.y { 1 } else { -1 },
            err: dx - dy,
            done: false,
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.done {
            return None;
        }
        let cell = GridPoint::new(self.x, self.y);
        if self.x == self.end.x && self.y == self.end.y {
            self.done = true;
            return Some(cell);
        }

        let e2 = 2 * self.err;
        if e2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(cell)
    }
}
