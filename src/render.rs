//! Render output
//!
//! Each tick the simulation publishes a [`Frame`]: one packed instance per
//! entity plus the events raised during the tick. Instances are plain old
//! data so a renderer can upload them as-is.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::Millis;
use crate::sim::registry::Registry;
use crate::sim::state::{Entity, EntityKind, SimEvent};

/// One sprite as seen by the renderer
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RenderInstance {
    /// Top-left after the latest commit
    pub position: [f32; 2],
    /// Top-left before the latest commit
    pub prev_position: [f32; 2],
    /// Scaled side length
    pub size: f32,
    /// [`EntityKind::tag`]
    pub kind: u32,
    /// Packed facing/frame, 0 for entities without an animation
    pub pose: u32,
    pub id: u32,
}

impl RenderInstance {
    pub fn from_entity(entity: &Entity, sprite_size: f32) -> Self {
        Self {
            position: entity.pos.to_array(),
            prev_position: entity.prev_pos.to_array(),
            size: entity.effective_size(sprite_size),
            kind: entity.kind.tag(),
            pose: entity.animator.as_ref().map_or(0, |a| a.pose().packed()),
            id: entity.id.0,
        }
    }

    /// Position blended between ticks (`alpha` in [0, 1])
    pub fn interpolated(&self, alpha: f32) -> Vec2 {
        let prev = Vec2::from_array(self.prev_position);
        let cur = Vec2::from_array(self.position);
        prev.lerp(cur, alpha.clamp(0.0, 1.0))
    }
}

/// Snapshot published after every tick
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub tick: u64,
    pub time_ms: Millis,
    /// Ordered by entity id
    pub instances: Vec<RenderInstance>,
    pub events: Vec<SimEvent>,
}

impl Frame {
    pub fn capture(
        tick: u64,
        time_ms: Millis,
        registry: &Registry,
        sprite_size: f32,
        events: Vec<SimEvent>,
    ) -> Self {
        Self {
            tick,
            time_ms,
            instances: registry
                .iter()
                .map(|e| RenderInstance::from_entity(e, sprite_size))
                .collect(),
            events,
        }
    }

    /// Instance data as raw bytes for a GPU buffer
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        let tag = kind.tag();
        self.instances.iter().filter(|i| i.kind == tag).count()
    }
}
