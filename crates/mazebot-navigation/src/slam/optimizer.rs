//! Fixed-iteration relaxation over pose-graph edges.
//!
//! This is a local smoother, not a least-squares solve. Each iteration walks
//! the edges in insertion order and nudges only the `to` node of every edge
//! against its residual:
//!
//! ```text
//! err   = (to - from) - delta          (θ component normalized)
//! w     = information · learning_rate
//! to   -= err · w
//! ```
//!
//! Results depend on edge order and on the exact constants, so both are kept
//! stable.

use mazebot_geometry::{Pose2D, normalize_angle};

use super::pose_graph::Edge;

/// Runs `iterations` relaxation passes starting from `poses`.
///
/// `poses` is indexed by node id. Edges whose endpoints fall outside it are
/// skipped.
pub fn relax(poses: &[Pose2D], edges: &[Edge], iterations: usize, learning_rate: f32) -> Vec<Pose2D> {
    let mut optimized = poses.to_vec();
    for _ in 0..iterations {
        relax_once(&mut optimized, edges, learning_rate);
    }
    optimized
}

fn relax_once(poses: &mut [Pose2D], edges: &[Edge], learning_rate: f32) {
    for edge in edges {
        let (Some(from), Some(to)) = (poses.get(edge.from as usize).copied(), poses.get(edge.to as usize).copied())
        else {
            continue;
        };

        let err_x = (to.x - from.x) - edge.delta_x;
        let err_y = (to.y - from.y) - edge.delta_y;
        let err_theta = normalize_angle(to.theta - from.theta - edge.delta_theta);
        let weight = edge.information * learning_rate;

        let target = &mut poses[edge.to as usize];
        target.x -= err_x * weight;
        target.y -= err_y * weight;
        target.theta = normalize_angle(target.theta - err_theta * weight);
    }
}
