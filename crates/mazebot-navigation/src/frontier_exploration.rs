//! Frontier detection over point-based maps.

use mazebot_geometry::WorldPoint;
use rand::seq::IndexedRandom;

/// Frontier detection and selection over point-based maps.
///
/// A frontier is a known free-space point lying close to a known obstacle
/// point, i.e. on the boundary between what has been swept and what blocks
/// further sweeping.
pub struct FrontierExploration;

impl FrontierExploration {
    /// Finds all free-space points that have an obstacle strictly closer than `threshold`.
    ///
    /// Brute force over every free/obstacle pair. Frontiers keep the order of `free_space`.
    ///
    /// # Arguments
    /// * `free_space` - Known free-space points.
    /// * `obstacles` - Known obstacle points.
    /// * `threshold` - Maximum distance to an obstacle, in meters.
    ///
    /// # Returns
    /// * `Vec<WorldPoint>` - The frontier points.
    pub fn find_frontiers(free_space: &[WorldPoint], obstacles: &[WorldPoint], threshold: f32) -> Vec<WorldPoint> {
        free_space
            .iter()
            .filter(|p| obstacles.iter().any(|o| p.distance_to(o) < threshold))
            .copied()
            .collect()
    }

    /// Selects the frontier closest to `position` (Euclidean). Ties go to the earliest frontier.
    ///
    /// # Returns
    /// * `Option<WorldPoint>` - The closest frontier, or None if the list is empty.
    pub fn select_closest_frontier(frontiers: &[WorldPoint], position: WorldPoint) -> Option<WorldPoint> {
        frontiers
            .iter()
            .copied()
            .min_by(|a, b| a.distance_to(&position).total_cmp(&b.distance_to(&position)))
    }

    /// Selects a random frontier from the list.
    ///
    /// # Returns
    /// * `Option<WorldPoint>` - A randomly selected frontier, or None if the list is empty.
    pub fn select_random_frontier<R: rand::Rng + ?Sized>(frontiers: &[WorldPoint], rng: &mut R) -> Option<WorldPoint> {
        frontiers.choose(rng).copied()
    }
}
