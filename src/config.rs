//! Simulation tuning
//!
//! Every field has a default, so a JSON file only needs the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::EntityKind;

/// Tunable simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tick period in milliseconds
    pub tick_ms: u64,
    /// Base speed in pixels per tick (scaled by each entity's multiplier)
    pub base_speed: f32,
    /// Unscaled sprite side in pixels
    pub sprite_size: f32,

    // === Cooldowns ===
    pub clone_cooldown_ms: u64,
    pub shrink_cooldown_ms: u64,

    // === Population caps ===
    pub max_family_per_kind: usize,
    pub max_stable: usize,
    pub max_roamer: usize,

    // === Size interactions ===
    pub shrink_factor: f32,
    pub grow_factor: f32,
    pub max_size_scale: f32,
    pub min_size_scale: f32,
    pub removal_threshold: u32,

    // === Roamer ===
    pub roamer_speed_multiplier: f32,
    pub roamer_min_distance: f32,
    pub roamer_overlap_factor: f32,

    // === Condition spawn ===
    pub condition_warmup_ms: u64,
    pub condition_period_ms: u64,
    pub placement_attempts: u32,

    // === Drag / fling ===
    pub fling_window_ms: u64,
    pub fling_samples: usize,
    pub fling_multiplier: f32,
    pub fling_max_speed: f32,

    // === Roamer animation ===
    pub animation_frame_ms: u64,
    pub moving_threshold: f32,
    /// Both axes must exceed this speed for a diagonal facing
    pub diagonal_min_velocity: f32,
    /// |vx| / |vy| band that counts as diagonal
    pub diagonal_ratio_min: f32,
    pub diagonal_ratio_max: f32,

    /// RNG seed (None = random per run)
    pub seed: Option<u64>,
    /// Create the seed originals and the roamer once bounds are known
    pub seed_population: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            base_speed: BASE_SPEED,
            sprite_size: SPRITE_SIZE,

            clone_cooldown_ms: CLONE_COOLDOWN_MS,
            shrink_cooldown_ms: SHRINK_COOLDOWN_MS,

            max_family_per_kind: MAX_FAMILY_PER_KIND,
            max_stable: MAX_STABLE,
            max_roamer: MAX_ROAMER,

            shrink_factor: SHRINK_FACTOR,
            grow_factor: GROW_FACTOR,
            max_size_scale: MAX_SIZE_SCALE,
            min_size_scale: MIN_SIZE_SCALE,
            removal_threshold: REMOVAL_THRESHOLD,

            roamer_speed_multiplier: ROAMER_SPEED_MULTIPLIER,
            roamer_min_distance: ROAMER_MIN_DISTANCE,
            roamer_overlap_factor: ROAMER_OVERLAP_FACTOR,

            condition_warmup_ms: CONDITION_WARMUP_MS,
            condition_period_ms: CONDITION_PERIOD_MS,
            placement_attempts: PLACEMENT_ATTEMPTS,

            fling_window_ms: FLING_WINDOW_MS,
            fling_samples: FLING_SAMPLES,
            fling_multiplier: FLING_MULTIPLIER,
            fling_max_speed: FLING_MAX_SPEED,

            animation_frame_ms: ANIMATION_FRAME_MS,
            moving_threshold: MOVING_THRESHOLD,
            diagonal_min_velocity: DIAGONAL_MIN_VELOCITY,
            diagonal_ratio_min: DIAGONAL_RATIO_MIN,
            diagonal_ratio_max: DIAGONAL_RATIO_MAX,

            seed: None,
            seed_population: true,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.tick_ms == 0 {
            return invalid("tick_ms", "must be positive");
        }
        if !(self.sprite_size.is_finite() && self.sprite_size > 0.0) {
            return invalid("sprite_size", "must be positive");
        }
        if !(self.base_speed.is_finite() && self.base_speed > 0.0) {
            return invalid("base_speed", "must be positive");
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return invalid("shrink_factor", "must be in (0, 1)");
        }
        if !(self.grow_factor.is_finite() && self.grow_factor >= 1.0) {
            return invalid("grow_factor", "must be at least 1");
        }
        if !(self.min_size_scale > 0.0 && self.min_size_scale <= 1.0) {
            return invalid("min_size_scale", "must be in (0, 1]");
        }
        if !(self.max_size_scale.is_finite() && self.max_size_scale >= 1.0) {
            return invalid("max_size_scale", "must be at least 1");
        }
        if !(self.roamer_speed_multiplier.is_finite() && self.roamer_speed_multiplier >= 1.0) {
            return invalid("roamer_speed_multiplier", "must be at least 1");
        }
        if !(self.roamer_min_distance.is_finite() && self.roamer_min_distance >= 1.0) {
            return invalid("roamer_min_distance", "must be at least 1");
        }
        if !(self.roamer_overlap_factor.is_finite() && self.roamer_overlap_factor >= 1.0) {
            return invalid("roamer_overlap_factor", "must be at least 1");
        }
        if !(self.fling_multiplier.is_finite() && self.fling_multiplier > 0.0) {
            return invalid("fling_multiplier", "must be positive");
        }
        if !(self.fling_max_speed.is_finite() && self.fling_max_speed > 0.0) {
            return invalid("fling_max_speed", "must be positive");
        }
        if !(self.moving_threshold.is_finite() && self.moving_threshold >= 0.0) {
            return invalid("moving_threshold", "must be non-negative");
        }
        if !(self.diagonal_min_velocity.is_finite() && self.diagonal_min_velocity >= 0.0) {
            return invalid("diagonal_min_velocity", "must be non-negative");
        }
        if !(self.diagonal_ratio_min.is_finite()
            && self.diagonal_ratio_max.is_finite()
            && self.diagonal_ratio_min >= 0.0
            && self.diagonal_ratio_min <= self.diagonal_ratio_max)
        {
            return invalid("diagonal_ratio_min", "must be a non-negative band up to diagonal_ratio_max");
        }
        if self.removal_threshold == 0 {
            return invalid("removal_threshold", "must be positive");
        }
        if self.condition_period_ms == 0 {
            return invalid("condition_period_ms", "must be positive");
        }
        if self.fling_samples == 0 {
            return invalid("fling_samples", "must be positive");
        }
        if self.animation_frame_ms == 0 {
            return invalid("animation_frame_ms", "must be positive");
        }
        Ok(())
    }

    /// Population cap for a kind
    pub fn population_cap(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::FamilyA | EntityKind::FamilyB => self.max_family_per_kind,
            EntityKind::Stable => self.max_stable,
            EntityKind::Roamer => self.max_roamer,
        }
    }

    /// Tick period as a fraction of a second
    pub fn tick_secs(&self) -> f32 {
        self.tick_ms as f32 / 1000.0
    }
}
