//! Collision detection and response for square sprites
//!
//! Sprites collide as axis-aligned squares but respond along the line
//! between their centers, reflecting velocities the same way a wall
//! bounce does.

use glam::Vec2;

use crate::consts::{SEPARATION_FORCE, SEPARATION_TARGET};
use crate::direction;
use crate::rng::RandomSource;

/// Contact geometry between two sprite centers
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Unit vector from the first center toward the second
    pub normal: Vec2,
    /// Center distance
    pub distance: f32,
}

impl Contact {
    /// Contact between two centers; coincident centers get a random normal
    pub fn between(center_a: Vec2, center_b: Vec2, rng: &mut dyn RandomSource) -> Self {
        let delta = center_b - center_a;
        let distance = delta.length();
        let normal = if distance > 0.0 {
            delta / distance
        } else {
            direction(rng.next_angle())
        };
        Self { normal, distance }
    }
}

/// Axis-aligned overlap test for two squares of side `size` (touching counts)
#[inline]
pub fn overlaps(pos_a: Vec2, pos_b: Vec2, size: f32) -> bool {
    !(pos_a.x + size < pos_b.x
        || pos_a.x > pos_b.x + size
        || pos_a.y + size < pos_b.y
        || pos_a.y > pos_b.y + size)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Velocity response for a colliding pair of squares of side `size`
///
/// Both velocities are mirrored about the center line. When the centers
/// coincide there is no line to mirror about, so the pair is pushed apart
/// along a random direction at `push_speed`.
pub fn reflect(
    pos_a: Vec2,
    vel_a: Vec2,
    pos_b: Vec2,
    vel_b: Vec2,
    size: f32,
    push_speed: f32,
    rng: &mut dyn RandomSource,
) -> (Vec2, Vec2) {
    let half = Vec2::splat(size / 2.0);
    let delta = (pos_b + half) - (pos_a + half);
    let distance = delta.length();

    if distance == 0.0 {
        let normal = direction(rng.next_angle());
        return (-push_speed * normal, push_speed * normal);
    }

    let normal = delta / distance;
    (reflect_velocity(vel_a, normal), reflect_velocity(vel_b, -normal))
}

/// Distance each sprite of an overlapping pair moves apart along the normal
///
/// Targets 110% of the average size, split between the two sprites and
/// boosted so they do not stick on the next tick.
#[inline]
pub fn separation(distance: f32, avg_size: f32) -> f32 {
    (avg_size * SEPARATION_TARGET - distance) / 2.0 * SEPARATION_FORCE
}

/// Whether two centers at `distance` penetrate deeper than the average size
#[inline]
pub fn needs_separation(distance: f32, avg_size: f32) -> bool {
    distance < avg_size
}
