//! Dense row-major 2D grid storage.

#![warn(missing_docs)]

use mazebot_geometry::GridPoint;

/// Occupancy state of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridCell {
    /// Nothing is known about this cell yet.
    #[default]
    Unknown,
    /// A sensor ray has passed through this cell.
    Free,
    /// A sensor ray has ended in this cell.
    Occupied,
}

impl GridCell {
    /// Single-character rendering used by the grid `Display` impl.
    pub fn as_char(&self) -> char {
        match self {
            GridCell::Unknown => '?',
            GridCell::Free => '.',
            GridCell::Occupied => '#',
        }
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridCell::Unknown => write!(f, "Unknown"),
            GridCell::Free => write!(f, "Free"),
            GridCell::Occupied => write!(f, "Occupied"),
        }
    }
}

/// A fixed-size 2D grid stored row by row.
///
/// Cell `[x, y]` lives at index `y * width + x`. Lookups with a
/// [`GridPoint`] outside the grid return `None` instead of panicking.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid<T> {
    /// Width of the grid in cells
    width: usize,
    /// Height of the grid in cells
    height: usize,
    /// Vector storing the cell values
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a `width × height` grid with every cell set to `value`.
    pub fn new(width: usize, height: usize, value: T) -> Self {
        Grid {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Grid<T> {
    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if `cell` lies inside the grid.
    pub fn contains(&self, cell: GridPoint) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    fn index(&self, cell: GridPoint) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.y as usize * self.width + cell.x as usize)
    }

    /// The value at `cell`, or `None` when out of bounds.
    pub fn get(&self, cell: GridPoint) -> Option<&T> {
        self.index(cell).map(|i| &self.data[i])
    }

    /// Mutable access to the value at `cell`, or `None` when out of bounds.
    pub fn get_mut(&mut self, cell: GridPoint) -> Option<&mut T> {
        self.index(cell).map(move |i| &mut self.data[i])
    }

    /// Iterates over `(cell, value)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPoint, &T)> + '_ {
        self.data.iter().enumerate().map(|(i, v)| {
            let x = (i % self.width) as i32;
            let y = (i / self.width) as i32;
            (GridPoint::new(x, y), v)
        })
    }

    /// The raw row-major cell values.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl std::fmt::Display for Grid<GridCell> {
    /// Renders the grid with the top row (largest `y`) first.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Grid ({}x{})", self.width, self.height)?;
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                write!(f, "{}", self.data[y * self.width + x].as_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
