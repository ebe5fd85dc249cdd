//! Loop-closure candidate search and scan-overlap validation.

use mazebot_geometry::WorldPoint;

use super::pose_graph::{PoseGraphConfig, PoseNode};

/// Indices of earlier keyframes that the node at `current` may close a loop with.
///
/// Nothing is returned until the graph holds `loop_closure_min_history` nodes.
/// Only `nodes[0 .. len - loop_closure_min_history]` are considered, so the most
/// recent stretch of the trajectory never matches itself. Candidates come back
/// in node order.
pub fn find_candidates(nodes: &[PoseNode], current: &PoseNode, config: &PoseGraphConfig) -> Vec<usize> {
    let window = config.loop_closure_min_history;
    if nodes.len() < window {
        return Vec::new();
    }

    nodes[..nodes.len() - window]
        .iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.is_keyframe)
        .filter(|(_, candidate)| {
            current.pose.distance_to(&candidate.pose) < config.loop_closure_distance
                && candidate.pose.angle_to(&current.pose).abs() < config.loop_closure_angle
        })
        .map(|(i, _)| i)
        .collect()
}

/// Returns `true` if the two local-frame scans overlap enough to confirm a revisit.
///
/// Each point of `current` counts as matched when some point of `candidate`
/// lies strictly within `loop_closure_match_distance`. The match ratio is taken
/// over `current` and must exceed `loop_closure_min_ratio`. Scans with fewer
/// than `loop_closure_min_points` points are never accepted.
pub fn scans_overlap(current: &[WorldPoint], candidate: &[WorldPoint], config: &PoseGraphConfig) -> bool {
    if current.len() < config.loop_closure_min_points || candidate.len() < config.loop_closure_min_points {
        return false;
    }

    let matches = current
        .iter()
        .filter(|p| {
            candidate
                .iter()
                .any(|q| p.distance_to(q) < config.loop_closure_match_distance)
        })
        .count();

    let ratio = matches as f32 / current.len() as f32;
    ratio > config.loop_closure_min_ratio
}
