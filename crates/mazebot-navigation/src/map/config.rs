//! Map configuration.

use mazebot_geometry::WorldPoint;

use crate::error::NavigationError;

/// Which representations [`OccupancyMap::update`](super::OccupancyMap::update) maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapType {
    /// Occupancy and probability grids only.
    OccupancyGrid,
    /// Point cloud, obstacle and free-space lists only.
    PointCloud,
    /// Both grids and point lists.
    #[default]
    Hybrid,
}

/// Geometry and sensor model of an occupancy map.
///
/// There are no implicit defaults: every session supplies a full configuration.
/// `origin` is the offset added to a world coordinate before dividing by the
/// resolution, so world `(-origin.x, -origin.y)` is the corner of cell `[0, 0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapConfig {
    /// Cell edge length (m/cell).
    pub resolution: f32,
    /// Map extent along x (m).
    pub width: f32,
    /// Map extent along y (m).
    pub height: f32,
    /// World-to-grid offset (m).
    pub origin: WorldPoint,
    /// Maximum sensor range (m).
    pub max_range: f32,
    /// Evidence applied to a cell a ray ends in.
    pub hit_probability: f32,
    /// Evidence applied to a cell a ray passes through.
    pub miss_probability: f32,
}

impl MapConfig {
    /// Checks the configuration for values the map cannot work with.
    ///
    /// The map itself never calls this; it is for configuration loaders.
    ///
    /// # Errors
    ///
    /// * `InvalidResolution` if `resolution` is not strictly positive.
    /// * `InvalidDimensions` if `width`, `height` or `max_range` is not strictly positive.
    /// * `InvalidProbability` if either probability lies outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if !(self.resolution > 0.0) {
            return Err(NavigationError::InvalidResolution("map resolution must be positive"));
        }
        if !(self.width > 0.0) || !(self.height > 0.0) {
            return Err(NavigationError::InvalidDimensions("map width and height must be positive"));
        }
        if !(self.max_range > 0.0) {
            return Err(NavigationError::InvalidDimensions("max range must be positive"));
        }
        for p in [self.hit_probability, self.miss_probability] {
            if !(p > 0.0 && p < 1.0) {
                return Err(NavigationError::InvalidProbability(
                    "sensor probabilities must lie in (0, 1)",
                ));
            }
        }
        Ok(())
    }

    /// Number of cells along x.
    pub fn grid_width(&self) -> usize {
        cells_along(self.width, self.resolution)
    }

    /// Number of cells along y.
    pub fn grid_height(&self) -> usize {
        cells_along(self.height, self.resolution)
    }
}

// Rounded so that e.g. 20.0 / 0.05 gives 400 despite f32 representation error.
pub(crate) fn cells_along(extent: f32, resolution: f32) -> usize {
    let cells = (extent / resolution).round();
    if cells.is_finite() && cells > 0.0 {
        cells as usize
    } else {
        0
    }
}
