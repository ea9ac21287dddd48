//! Link definition.

use crate::Joint;
use idyn_math::SpatialInertia;

/// A rigid link in the kinematic tree, together with the joint that
/// attaches it to its parent.
#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    /// Index of the parent link (-1 for the fixed base).
    pub parent: i32,
    pub joint: Joint,
    /// Barycentric inertia in the link frame.
    pub inertia: SpatialInertia,
}
