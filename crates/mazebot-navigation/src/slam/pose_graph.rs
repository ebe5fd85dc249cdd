//! Pose graph with keyframing, loop closure and a point-based global map.

use std::time::SystemTime;

use mazebot_geometry::{Pose2D, WorldPoint, normalize_angle};
use tracing::{debug, info};

use super::{loop_closure, optimizer};
use crate::error::NavigationError;
use crate::map::PointSet;

/// Tuning parameters of the pose graph.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoseGraphConfig {
    /// Travel since the last keyframe that makes a new keyframe (m).
    pub key_frame_distance: f32,
    /// Rotation since the last keyframe that makes a new keyframe (rad).
    pub key_frame_angle: f32,
    /// Maximum distance to a loop-closure candidate (m).
    pub loop_closure_distance: f32,
    /// Maximum heading difference to a loop-closure candidate (rad).
    pub loop_closure_angle: f32,
    /// Number of most recent nodes excluded from loop-closure search.
    pub loop_closure_min_history: usize,
    /// Distance under which two scan points count as matched (m).
    pub loop_closure_match_distance: f32,
    /// Match ratio a candidate must exceed to be accepted.
    pub loop_closure_min_ratio: f32,
    /// Both scans need at least this many points to be compared.
    pub loop_closure_min_points: usize,
    /// Minimum spacing of global map and free-space points (m).
    pub map_point_spacing: f32,
    /// Sampling step for free space along a scan ray (m).
    pub free_space_step: f32,
    /// Edge weight of odometry constraints.
    pub odometry_information: f32,
    /// Edge weight of loop-closure constraints.
    pub loop_closure_information: f32,
    /// Relaxation passes per optimization.
    pub optimization_iterations: usize,
    /// Step size of each relaxation update.
    pub learning_rate: f32,
}

impl Default for PoseGraphConfig {
    fn default() -> Self {
        PoseGraphConfig {
            key_frame_distance: 0.5,
            key_frame_angle: 0.3,
            loop_closure_distance: 2.0,
            loop_closure_angle: 0.5,
            loop_closure_min_history: 10,
            loop_closure_match_distance: 0.2,
            loop_closure_min_ratio: 0.3,
            loop_closure_min_points: 10,
            map_point_spacing: 0.05,
            free_space_step: 0.1,
            odometry_information: 1.0,
            loop_closure_information: 10.0,
            optimization_iterations: 10,
            learning_rate: 0.1,
        }
    }
}

/// A recorded robot pose with the scan taken there.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseNode {
    /// Monotonic id, equal to the node's position in the graph.
    pub id: u64,
    /// World-frame pose.
    pub pose: Pose2D,
    /// Wall-clock time the node was created.
    pub timestamp: SystemTime,
    /// Scan points in the robot's local frame.
    pub scan: Vec<WorldPoint>,
    /// Whether this node anchors edges and contributed to the global map.
    pub is_keyframe: bool,
}

/// Origin of a pose-graph constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// Consecutive poses.
    Odometry,
    /// A confirmed revisit.
    LoopClosure,
    /// A scan-matching result supplied from outside.
    LidarMatch,
}

/// A relative-pose constraint between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    /// Id of the reference node.
    pub from: u64,
    /// Id of the constrained node.
    pub to: u64,
    /// Expected `to.x - from.x` (m).
    pub delta_x: f32,
    /// Expected `to.y - from.y` (m).
    pub delta_y: f32,
    /// Expected heading change, normalized (rad).
    pub delta_theta: f32,
    /// Constraint weight.
    pub information: f32,
    /// Where the constraint came from.
    pub kind: EdgeKind,
}

/// Keyframe pose graph and its point-based global map.
///
/// Every getter that exposes a collection returns an owned copy.
#[derive(Debug, Clone)]
pub struct PoseGraph {
    config: PoseGraphConfig,
    nodes: Vec<PoseNode>,
    edges: Vec<Edge>,
    /// Result of the last optimization, indexed by node id.
    optimized: Vec<Pose2D>,
    next_id: u64,
    last_keyframe: Option<usize>,
    map_points: PointSet,
    obstacle_points: PointSet,
    free_space_points: PointSet,
    optimization_count: usize,
}

impl Default for PoseGraph {
    fn default() -> Self {
        Self::new(PoseGraphConfig::default())
    }
}

impl PoseGraph {
    /// Creates an empty pose graph.
    pub fn new(config: PoseGraphConfig) -> Self {
        let spacing = config.map_point_spacing;
        PoseGraph {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
            optimized: Vec::new(),
            next_id: 0,
            last_keyframe: None,
            map_points: PointSet::new(spacing),
            obstacle_points: PointSet::new(spacing),
            free_space_points: PointSet::new(spacing),
            optimization_count: 0,
        }
    }

    /// The configuration this graph was built with.
    pub fn config(&self) -> &PoseGraphConfig {
        &self.config
    }

    /// Records a pose and its local-frame scan.
    ///
    /// A node is always appended. When the pose has moved or turned far enough
    /// from the last keyframe it becomes a keyframe: an odometry edge from the
    /// previous node is added, its scan is folded into the global map, and a
    /// loop closure is searched for.
    ///
    /// # Returns
    ///
    /// The id of the new node. Ids start at 0 and increase by exactly 1.
    pub fn add_pose(&mut self, pose: Pose2D, scan: &[WorldPoint]) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let node = PoseNode {
            id,
            pose,
            timestamp: SystemTime::now(),
            scan: scan.to_vec(),
            is_keyframe: false,
        };
        let is_keyframe = self.is_new_keyframe(&node.pose);
        self.nodes.push(node);

        if is_keyframe {
            let index = self.nodes.len() - 1;
            self.nodes[index].is_keyframe = true;
            self.last_keyframe = Some(index);
            debug!(id, x = pose.x, y = pose.y, theta = pose.theta, scan = scan.len(), "New keyframe");

            if index > 0 {
                let prev = self.nodes[index - 1].pose;
                self.edges.push(Edge {
                    from: id - 1,
                    to: id,
                    delta_x: pose.x - prev.x,
                    delta_y: pose.y - prev.y,
                    delta_theta: normalize_angle(pose.theta - prev.theta),
                    information: self.config.odometry_information,
                    kind: EdgeKind::Odometry,
                });
            }

            self.integrate_scan(index);
            self.detect_loop_closure(index);
        }

        id
    }

    fn is_new_keyframe(&self, pose: &Pose2D) -> bool {
        let Some(last) = self.last_keyframe.and_then(|i| self.nodes.get(i)) else {
            return true;
        };
        pose.distance_to(&last.pose) > self.config.key_frame_distance
            || last.pose.angle_to(pose).abs() > self.config.key_frame_angle
    }

    /// Adds the keyframe's hits and the free space leading up to them.
    fn integrate_scan(&mut self, index: usize) {
        let node = &self.nodes[index];
        let step = self.config.free_space_step;

        for local in &node.scan {
            let hit = node.pose.transform_point(local);
            if self.map_points.insert(hit) {
                self.obstacle_points.insert(hit);
            }

            let range = local.distance_to(&WorldPoint::default());
            if range > step {
                let steps = (range / step) as usize;
                for i in 1..steps {
                    let t = i as f32 / steps as f32;
                    let sample = WorldPoint::new(local.x * t, local.y * t);
                    self.free_space_points.insert(node.pose.transform_point(&sample));
                }
            }
        }
    }

    fn detect_loop_closure(&mut self, index: usize) {
        let current = &self.nodes[index];
        let candidates = loop_closure::find_candidates(&self.nodes, current, &self.config);

        let accepted = candidates
            .into_iter()
            .find(|&c| loop_closure::scans_overlap(&current.scan, &self.nodes[c].scan, &self.config));

        if let Some(c) = accepted {
            let (from, to) = (&self.nodes[c], &self.nodes[index]);
            let edge = Edge {
                from: from.id,
                to: to.id,
                delta_x: to.pose.x - from.pose.x,
                delta_y: to.pose.y - from.pose.y,
                delta_theta: normalize_angle(to.pose.theta - from.pose.theta),
                information: self.config.loop_closure_information,
                kind: EdgeKind::LoopClosure,
            };
            info!(from = edge.from, to = edge.to, "Loop closure detected");
            self.edges.push(edge);
            self.optimize();
        }
    }

    /// Adds an externally derived constraint.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownNode` if either endpoint has not been added.
    pub fn add_edge(
        &mut self,
        from: u64,
        to: u64,
        delta: Pose2D,
        information: f32,
        kind: EdgeKind,
    ) -> Result<(), NavigationError> {
        for id in [from, to] {
            if id >= self.next_id {
                return Err(NavigationError::UnknownNode(id));
            }
        }
        self.edges.push(Edge {
            from,
            to,
            delta_x: delta.x,
            delta_y: delta.y,
            delta_theta: normalize_angle(delta.theta),
            information,
            kind,
        });
        Ok(())
    }

    /// Relaxes a copy of the node poses against all edges.
    ///
    /// Does nothing with fewer than three nodes. The raw nodes are left untouched.
    pub fn optimize(&mut self) {
        if self.nodes.len() < 3 {
            return;
        }
        let poses: Vec<Pose2D> = self.nodes.iter().map(|n| n.pose).collect();
        self.optimized = optimizer::relax(
            &poses,
            &self.edges,
            self.config.optimization_iterations,
            self.config.learning_rate,
        );
        self.optimization_count += 1;
        info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            run = self.optimization_count,
            "Pose graph optimized"
        );
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of keyframes.
    pub fn keyframe_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_keyframe).count()
    }

    /// Number of loop-closure edges.
    pub fn loop_closure_count(&self) -> usize {
        self.edges.iter().filter(|e| e.kind == EdgeKind::LoopClosure).count()
    }

    /// Number of completed optimization runs since creation or the last `clear`.
    pub fn optimization_count(&self) -> usize {
        self.optimization_count
    }

    /// The most recently added node.
    pub fn current_pose(&self) -> Option<PoseNode> {
        self.nodes.last().cloned()
    }

    /// Copy of every node.
    pub fn nodes(&self) -> Vec<PoseNode> {
        self.nodes.clone()
    }

    /// Copy of every edge, in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.edges.clone()
    }

    /// Positions of the optimized nodes, or of the raw nodes if no
    /// optimization has run yet.
    pub fn optimized_trajectory(&self) -> Vec<WorldPoint> {
        if self.optimized.is_empty() {
            self.nodes.iter().map(|n| n.pose.position()).collect()
        } else {
            self.optimized.iter().map(Pose2D::position).collect()
        }
    }

    /// Copy of the global map points.
    pub fn global_map_points(&self) -> Vec<WorldPoint> {
        self.map_points.to_vec()
    }

    /// Copy of the obstacle points.
    pub fn obstacle_points(&self) -> Vec<WorldPoint> {
        self.obstacle_points.to_vec()
    }

    /// Copy of the free-space points.
    pub fn free_space_points(&self) -> Vec<WorldPoint> {
        self.free_space_points.to_vec()
    }

    /// Drops all nodes, edges and map points and resets the id counter.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.optimized.clear();
        self.map_points.clear();
        self.obstacle_points.clear();
        self.free_space_points.clear();
        self.next_id = 0;
        self.last_keyframe = None;
        self.optimization_count = 0;
    }

    /// One-line summary of the graph.
    pub fn statistics(&self) -> String {
        format!(
            "nodes: {}, edges: {}, keyframes: {}, loop closures: {}, map points: {}, obstacle points: {}",
            self.nodes.len(),
            self.edges.len(),
            self.keyframe_count(),
            self.loop_closure_count(),
            self.map_points.len(),
            self.obstacle_points.len()
        )
    }
}
