//! Swarm Sim - bouncing sprite swarm simulation core
//!
//! Core modules:
//! - `sim`: Fixed-rate simulation (registry, collisions, spawning, drag/fling, animation)
//! - `runtime`: Simulation thread fed by a command channel
//! - `render`: Packed per-entity output for renderers
//! - `feed`: Deriving the external signals from volume samples
//! - `config`: Data-driven tuning

pub mod config;
pub mod error;
pub mod feed;
pub mod render;
pub mod rng;
pub mod runtime;
pub mod sim;

pub use config::SimConfig;
pub use error::ConfigError;
pub use rng::{RandomSource, ScriptedRandom};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed tick period (~60 Hz)
    pub const TICK_MS: u64 = 16;

    /// Base movement speed in pixels per tick
    pub const BASE_SPEED: f32 = 3.0;
    /// Unscaled sprite side length in pixels
    pub const SPRITE_SIZE: f32 = 64.0;

    /// Window after any clone spawn during which no clone may spawn
    pub const CLONE_COOLDOWN_MS: u64 = 3000;
    /// Per-entity cooldown between damaging shrinks
    pub const SHRINK_COOLDOWN_MS: u64 = 3000;

    /// Population caps
    pub const MAX_FAMILY_PER_KIND: usize = 5;
    pub const MAX_STABLE: usize = 10;
    pub const MAX_ROAMER: usize = 1;

    /// Scale applied on a damaging collision
    pub const SHRINK_FACTOR: f32 = 0.75;
    /// Scale applied when two Stable entities meet
    pub const GROW_FACTOR: f32 = 1.25;
    /// Growth cap once an entity is at or above full size
    pub const MAX_SIZE_SCALE: f32 = 1.25;
    /// Smallest scale the uncapped roamer shrink can reach
    pub const MIN_SIZE_SCALE: f32 = 0.05;
    /// Damaging collisions before a Stable entity is removed
    pub const REMOVAL_THRESHOLD: u32 = 4;

    /// Roamer speed multiplier (fixed)
    pub const ROAMER_SPEED_MULTIPLIER: f32 = 3.0;
    /// Minimum center distance the roamer enforces, in average sizes
    pub const ROAMER_MIN_DISTANCE: f32 = 1.5;
    /// Extra push applied on top of the roamer's minimum distance
    pub const ROAMER_OVERLAP_FACTOR: f32 = 1.25;

    /// Generic overlap correction: target distance and force
    pub const SEPARATION_TARGET: f32 = 1.1;
    pub const SEPARATION_FORCE: f32 = 1.5;
    /// Clone placement offset along the collision normal, in average sizes
    pub const CLONE_OFFSET: f32 = 0.75;

    /// Condition-triggered spawn schedule
    pub const CONDITION_WARMUP_MS: u64 = 5000;
    pub const CONDITION_PERIOD_MS: u64 = 5000;
    pub const PLACEMENT_ATTEMPTS: u32 = 50;

    /// Drag/fling tuning
    pub const FLING_WINDOW_MS: u64 = 100;
    pub const FLING_SAMPLES: usize = 10;
    pub const FLING_MULTIPLIER: f32 = 50.0;
    pub const FLING_MAX_SPEED: f32 = 50.0;

    /// Roamer animation tuning
    pub const ANIMATION_FRAME_MS: u64 = 150;
    pub const MOVING_THRESHOLD: f32 = 0.1;
    pub const DIAGONAL_MIN_VELOCITY: f32 = 0.1;
    pub const DIAGONAL_RATIO_MIN: f32 = 0.3;
    pub const DIAGONAL_RATIO_MAX: f32 = 3.0;

    /// Velocity magnitude below which an entity counts as stalled
    pub const STALL_SPEED: f32 = 0.1;
}

/// Timestamp in milliseconds on the simulation clock
pub type Millis = u64;

/// Replace each non-finite component of `v` with the matching component of `fallback`
#[inline]
pub fn sanitize_vec(v: Vec2, fallback: Vec2) -> Vec2 {
    Vec2::new(
        if v.x.is_finite() { v.x } else { fallback.x },
        if v.y.is_finite() { v.y } else { fallback.y },
    )
}

/// Unit vector at `angle` radians
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Clamp a top-left position so a square of side `size` stays inside `bounds`
#[inline]
pub fn clamp_to_bounds(pos: Vec2, size: f32, bounds: Vec2) -> Vec2 {
    let max = (bounds - Vec2::splat(size)).max(Vec2::ZERO);
    pos.clamp(Vec2::ZERO, max)
}
