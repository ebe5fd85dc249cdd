//! Map-related functionality for navigation.
//!
//! This module provides the probabilistic occupancy map that the rest of the
//! crate builds on, along with its storage, configuration and ray-casting
//! helpers.

pub mod config;
pub mod grid;
pub mod occupancy;
pub mod point_set;
pub mod raycast;

pub use config::{MapConfig, MapType};
pub use grid::{Grid, GridCell};
pub use occupancy::{CellCounts, OccupancyMap};
pub use point_set::PointSet;
pub use raycast::BresenhamLine;
