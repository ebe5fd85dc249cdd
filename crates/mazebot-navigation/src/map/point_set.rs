//! Spacing-deduplicated point lists.
//!
//! Repeated scans of the same wall keep landing on nearly the same world
//! coordinates. A [`PointSet`] drops any new point that falls closer than its
//! minimum spacing to a point it already holds, which bounds growth to roughly
//! one point per `spacing × spacing` patch of observed surface.

use mazebot_geometry::WorldPoint;

/// An insertion-ordered list of world points with a minimum spacing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointSet {
    /// Points closer than this to an existing point are rejected (m).
    spacing: f32,
    points: Vec<WorldPoint>,
}

impl PointSet {
    /// Creates an empty set with the given minimum spacing in meters.
    pub fn new(spacing: f32) -> Self {
        PointSet {
            spacing,
            points: Vec::new(),
        }
    }

    /// The minimum spacing between stored points.
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Inserts `point` unless an existing point is strictly closer than the spacing.
    ///
    /// # Returns
    ///
    /// `true` if the point was stored.
    pub fn insert(&mut self, point: WorldPoint) -> bool {
        if self.any_within(&point, self.spacing) {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Returns `true` if any stored point is strictly closer than `radius` to `point`.
    pub fn any_within(&self, point: &WorldPoint, radius: f32) -> bool {
        self.points.iter().any(|p| p.distance_to(point) < radius)
    }

    /// Stored points in insertion order.
    pub fn as_slice(&self) -> &[WorldPoint] {
        &self.points
    }

    /// An owned copy of the stored points.
    pub fn to_vec(&self) -> Vec<WorldPoint> {
        self.points.clone()
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Removes every point, keeping the spacing.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
