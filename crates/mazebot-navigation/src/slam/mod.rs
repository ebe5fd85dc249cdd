//! Keyframe pose graph SLAM.
//!
//! The [`PoseGraph`] records every pose handed to it, promotes some of them to
//! keyframes, links keyframes with odometry constraints, and watches for loop
//! closures. An accepted loop closure triggers a fixed-iteration relaxation
//! pass over a copy of the node poses (see [`optimizer`]). The raw nodes are
//! never modified.
//!
//! Alongside the graph, keyframe scans are folded into a point-based global
//! map (obstacle and free-space points) independent of the occupancy grid.

pub mod loop_closure;
pub mod optimizer;
pub mod pose_graph;

pub use pose_graph::{Edge, EdgeKind, PoseGraph, PoseGraphConfig, PoseNode};
