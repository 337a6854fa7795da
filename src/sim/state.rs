//! Entity and signal types
//!
//! Everything the registry stores and the simulation step reads lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::animation::Animator;
use crate::Millis;

/// Stable entity identity, allocated monotonically and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Speed tracks the first external source
    FamilyA,
    /// Speed tracks the second external source
    FamilyB,
    /// Grows and shrinks through collisions, removed after repeated damage
    Stable,
    /// Singleton that bounces others but is never bounced itself
    Roamer,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::FamilyA,
        EntityKind::FamilyB,
        EntityKind::Stable,
        EntityKind::Roamer,
    ];

    #[inline]
    pub fn is_family(self) -> bool {
        matches!(self, EntityKind::FamilyA | EntityKind::FamilyB)
    }

    /// Only family entities can be picked up by the user
    #[inline]
    pub fn is_draggable(self) -> bool {
        self.is_family()
    }

    /// Numeric tag for render output
    pub fn tag(self) -> u32 {
        match self {
            EntityKind::FamilyA => 0,
            EntityKind::FamilyB => 1,
            EntityKind::Stable => 2,
            EntityKind::Roamer => 3,
        }
    }
}

/// A simulated sprite
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Top-left corner in pixels
    pub pos: Vec2,
    /// Pixels per tick
    pub vel: Vec2,
    /// Position before the last commit (for render interpolation)
    pub prev_pos: Vec2,
    pub is_original: bool,
    pub speed_multiplier: f32,
    /// Collision and visual scale, always > 0
    pub size_scale: f32,
    /// Damaging collisions taken (Stable only)
    pub interaction_count: u32,
    /// When this entity last took part in a clone spawn
    pub last_spawn_ms: Option<Millis>,
    /// When this entity last shrank from a damaging collision
    pub last_shrink_ms: Option<Millis>,
    /// Facing/frame state (Roamer only)
    pub animator: Option<Animator>,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            vel,
            prev_pos: pos,
            is_original: false,
            speed_multiplier: 1.0,
            size_scale: 1.0,
            interaction_count: 0,
            last_spawn_ms: None,
            last_shrink_ms: None,
            animator: (kind == EntityKind::Roamer).then(Animator::default),
        }
    }

    pub fn original(mut self) -> Self {
        self.is_original = true;
        self
    }

    pub fn with_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.speed_multiplier = multiplier;
        self
    }

    pub fn with_size_scale(mut self, scale: f32) -> Self {
        self.size_scale = scale;
        self
    }

    /// Side length of the collision square
    #[inline]
    pub fn effective_size(&self, sprite_size: f32) -> f32 {
        sprite_size * self.size_scale
    }

    /// Center of the collision square
    #[inline]
    pub fn center(&self, sprite_size: f32) -> Vec2 {
        self.pos + Vec2::splat(self.effective_size(sprite_size) / 2.0)
    }
}

/// Externally driven inputs, read-only from the simulation's point of view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub family_a_multiplier: f32,
    pub family_b_multiplier: f32,
    /// Whether the condition-triggered Stable spawn is armed
    pub spawn_condition: bool,
}

impl Default for Signals {
    fn default() -> Self {
        Self {
            family_a_multiplier: 1.0,
            family_b_multiplier: 1.0,
            spawn_condition: false,
        }
    }
}

impl Signals {
    /// Current multiplier for a family kind (None for the fixed-speed kinds)
    pub fn family_multiplier(&self, kind: EntityKind) -> Option<f32> {
        match kind {
            EntityKind::FamilyA => Some(self.family_a_multiplier),
            EntityKind::FamilyB => Some(self.family_b_multiplier),
            _ => None,
        }
    }

    /// Store a family multiplier; returns false for the fixed-speed kinds
    pub fn set_family_multiplier(&mut self, kind: EntityKind, value: f32) -> bool {
        match kind {
            EntityKind::FamilyA => self.family_a_multiplier = value,
            EntityKind::FamilyB => self.family_b_multiplier = value,
            _ => return false,
        }
        true
    }
}

/// Why an entity was spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnCause {
    /// Seed original created at startup
    Seed,
    /// Clone of a colliding pair
    Collision { parents: (EntityId, EntityId) },
    /// External spawn condition
    Condition,
}

/// Notifications emitted to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    Spawned {
        id: EntityId,
        kind: EntityKind,
        cause: SpawnCause,
    },
    Removed {
        id: EntityId,
        kind: EntityKind,
    },
    /// A dragged entity was let go with this velocity
    Released { id: EntityId, vel: Vec2 },
}

/// Side and size-scale rules shared by the interaction matrix
pub mod scale {
    /// Damaging shrink, never reaching zero
    #[inline]
    pub fn shrink(scale: f32, factor: f32, floor: f32) -> f32 {
        (scale * factor).max(floor)
    }

    /// Growth capped at 1.0 from below, or at `max` once already full size
    #[inline]
    pub fn grow(scale: f32, factor: f32, max: f32) -> f32 {
        let grown = scale * factor;
        if scale < 1.0 {
            grown.min(1.0)
        } else {
            grown.min(max)
        }
    }
}
