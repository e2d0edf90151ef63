//! Circle overlap detection and positional correction
//!
//! Drop pieces are circles. Overlaps are resolved by moving both pieces
//! apart along the line between their centers; velocities are left alone.

use glam::Vec2;

/// Result of an overlap check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the circles overlap
    pub hit: bool,
    /// Unit vector from the first center toward the second
    pub normal: Vec2,
    /// Overlap depth (sum of radii minus center distance)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Minimum distance used when two centers coincide
const COINCIDENT_EPSILON: f32 = 0.001;

/// Check overlap between circle `a` and circle `b`
pub fn circle_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = b_pos - a_pos;
    let min_dist = a_radius + b_radius;
    let dist_sq = delta.length_squared();
    if dist_sq >= min_dist * min_dist {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt().max(COINCIDENT_EPSILON);
    // Coincident centers separate vertically so stacking stays stable
    let normal = if dist_sq > 0.0 { delta / dist } else { Vec2::Y };

    CollisionResult {
        hit: true,
        normal,
        penetration: min_dist - dist,
    }
}

/// Split a correction symmetrically between two circles
///
/// Returns `(a_offset, b_offset)`; each moves half the penetration.
pub fn separation(result: &CollisionResult) -> (Vec2, Vec2) {
    if !result.hit {
        return (Vec2::ZERO, Vec2::ZERO);
    }
    let half = result.normal * (result.penetration * 0.5);
    (-half, half)
}
