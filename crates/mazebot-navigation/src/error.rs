//! This module defines the error types used by the `mazebot-navigation` crate.
//!
//! The mapping, SLAM and planning algorithms report failure through booleans
//! and empty results. These errors only come from configuration validation
//! and from explicitly supplied pose-graph constraints.

use thiserror::Error;

/// Error type for navigation configuration and graph construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    /// A map or planner resolution that is not strictly positive.
    #[error("invalid resolution: {0}")]
    InvalidResolution(&'static str),
    /// A map or planner extent that is not strictly positive.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// A sensor model probability outside the open interval `(0, 1)`.
    #[error("invalid probability: {0}")]
    InvalidProbability(&'static str),
    /// An edge referencing a pose-graph node that does not exist.
    #[error("unknown pose graph node: {0}")]
    UnknownNode(u64),
}
