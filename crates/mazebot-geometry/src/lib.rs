#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library of planar geometry types for a maze-mapping robot."]
#![doc = ""]
#![doc = "This crate provides world and grid point types, a 2D pose with a"]
#![doc = "local-to-world point transform, and angle normalization."]

use core::f32::consts::{PI, TAU};
use core::fmt;
use libm::{atan2f, cosf, hypotf, sinf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Normalize an angle to be within `[-PI, PI]`.
///
/// Whole turns are removed one at a time, so `PI` and `-PI` are both returned
/// unchanged.
///
/// # Arguments
///
/// * `angle`: The angle in radians to normalize.
///
/// # Returns
///
/// The normalized angle in radians.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    let mut a = angle;
    while a > PI {
        a -= TAU;
    }
    while a < -PI {
        a += TAU;
    }
    a
}

/// A point in the world frame, in meters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldPoint {
    /// World-frame x coordinate (m).
    pub x: f32,
    /// World-frame y coordinate (m).
    pub y: f32,
}

impl WorldPoint {
    /// Construct a new world point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        WorldPoint { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: &WorldPoint) -> f32 {
        hypotf(other.x - self.x, other.y - self.y)
    }

    /// Bearing from this point towards `other`, in radians.
    #[must_use]
    pub fn bearing_to(&self, other: &WorldPoint) -> f32 {
        atan2f(other.y - self.y, other.x - self.x)
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// A cell index in a 2D grid.
///
/// Indices are signed: converting a world point that lies left of or below
/// the grid origin produces negative indices, which bounds checks reject.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridPoint {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl GridPoint {
    /// Construct a new grid point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        GridPoint { x, y }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// A 2-D pose `(x, y, θ)` in meters and radians (θ measured counter-clockwise
/// from the x-axis in the world frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    /// World-frame x position (m).
    pub x: f32,
    /// World-frame y position (m).
    pub y: f32,
    /// Heading (rad).
    pub theta: f32,
}

impl Pose2D {
    /// Construct a new pose.
    ///
    /// # Arguments
    ///
    /// * `x`: World-frame x position in meters.
    /// * `y`: World-frame y position in meters.
    /// * `theta`: Heading in radians.
    pub const fn new(x: f32, y: f32, theta: f32) -> Self {
        Pose2D { x, y, theta }
    }

    /// The position part of the pose.
    #[must_use]
    pub const fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }

    /// Transform a point from the robot's local frame into the world frame.
    ///
    /// The point is rotated by `theta` and then translated by the pose position.
    ///
    /// # Arguments
    ///
    /// * `local`: Point in the robot frame (x forward, y left).
    ///
    /// # Returns
    ///
    /// The same point expressed in the world frame.
    #[must_use]
    pub fn transform_point(&self, local: &WorldPoint) -> WorldPoint {
        let (s, c) = (sinf(self.theta), cosf(self.theta));
        WorldPoint::new(
            self.x + local.x * c - local.y * s,
            self.y + local.x * s + local.y * c,
        )
    }

    /// Euclidean distance between the positions of two poses.
    #[must_use]
    pub fn distance_to(&self, other: &Pose2D) -> f32 {
        hypotf(other.x - self.x, other.y - self.y)
    }

    /// Signed heading difference `other.theta - self.theta`, normalized.
    #[must_use]
    pub fn angle_to(&self, other: &Pose2D) -> f32 {
        normalize_angle(other.theta - self.theta)
    }
}

impl fmt::Display for Pose2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}
