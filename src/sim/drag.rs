//! Drag and fling
//!
//! At most one family entity can be held at a time. While held it follows
//! the pointer, pushes overlapping entities aside and keeps a short history
//! of move deltas; on release that history becomes its fling velocity.

use std::collections::VecDeque;

use glam::Vec2;

use super::collision::{Contact, needs_separation, overlaps, separation};
use super::registry::Registry;
use super::state::EntityId;
use crate::config::SimConfig;
use crate::rng::RandomSource;
use crate::{Millis, clamp_to_bounds, sanitize_vec};

/// One pointer move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSample {
    pub delta: Vec2,
    pub at: Millis,
}

/// State of the entity currently held
#[derive(Debug, Clone)]
pub struct DragSession {
    pub id: EntityId,
    /// Entity center when the drag began
    pub anchor: Vec2,
    /// Sum of every move delta since the drag began
    pub cumulative: Vec2,
    history: VecDeque<DragSample>,
    /// Pointer-following center after the latest move
    last_center: Vec2,
    last_at: Millis,
    started_at: Millis,
}

impl DragSession {
    fn new(id: EntityId, anchor: Vec2, now: Millis) -> Self {
        Self {
            id,
            anchor,
            cumulative: Vec2::ZERO,
            history: VecDeque::new(),
            last_center: anchor,
            last_at: now,
            started_at: now,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &DragSample> {
        self.history.iter()
    }

    /// Drop samples older than `window` ms before `now`
    fn prune(&mut self, now: Millis, window: Millis) {
        while self
            .history
            .front()
            .is_some_and(|s| now.saturating_sub(s.at) > window)
        {
            self.history.pop_front();
        }
    }
}

#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Pick up `id`; refused while another drag is active or for kinds that
    /// cannot be dragged
    pub fn start(
        &mut self,
        registry: &mut Registry,
        id: EntityId,
        touch: Vec2,
        now: Millis,
        config: &SimConfig,
    ) -> bool {
        if self.session.is_some() {
            log::debug!("Drag of {id} refused: another drag is active");
            return false;
        }
        let Some(entity) = registry.get(id) else {
            return false;
        };
        if !entity.kind.is_draggable() {
            log::debug!("Drag of {id} refused: {:?} is not draggable", entity.kind);
            return false;
        }
        let anchor = entity.center(config.sprite_size);
        if !registry.claim_drag(id) {
            return false;
        }

        log::debug!("Drag start {id} (touch at {:.1}, {:.1})", touch.x, touch.y);
        self.session = Some(DragSession::new(id, anchor, now));
        true
    }

    /// Move the held entity by `delta`
    ///
    /// Overlapping entities are pushed aside; velocities are left alone.
    /// Ignored unless `id` is the entity being dragged.
    pub fn drag_move(
        &mut self,
        registry: &mut Registry,
        id: EntityId,
        delta: Vec2,
        now: Millis,
        config: &SimConfig,
        rng: &mut dyn RandomSource,
    ) -> bool {
        let Some(session) = self.session.as_mut().filter(|s| s.id == id) else {
            return false;
        };
        let (Some(bounds), Some(entity)) = (registry.bounds(), registry.get(id)) else {
            return false;
        };
        let mut entity = entity.clone();

        let delta = sanitize_vec(delta, Vec2::ZERO);
        let sprite = config.sprite_size;
        let size = entity.effective_size(sprite);

        session.cumulative += delta;
        let center = session.anchor + session.cumulative;
        session.history.push_back(DragSample { delta, at: now });
        session.prune(now, config.fling_window_ms);
        session.last_center = center;
        session.last_at = now;

        let target = center - Vec2::splat(size / 2.0);
        let mut pos = sanitize_vec(clamp_to_bounds(target, size, bounds), entity.pos);

        for mut other in registry.snapshot() {
            if other.id == id {
                continue;
            }
            let other_size = other.effective_size(sprite);
            let avg = (size + other_size) / 2.0;
            if !overlaps(pos, other.pos, avg) {
                continue;
            }
            let contact = Contact::between(pos + Vec2::splat(size / 2.0), other.center(sprite), rng);
            if !needs_separation(contact.distance, avg) {
                continue;
            }
            let sep = separation(contact.distance, avg);
            pos = clamp_to_bounds(pos - contact.normal * sep, size, bounds);
            other.pos = clamp_to_bounds(other.pos + contact.normal * sep, other_size, bounds);
            registry.update(other);
        }

        entity.prev_pos = entity.pos;
        entity.pos = pos;
        registry.update(entity);
        true
    }

    /// Let go of `id` and give it its fling velocity
    ///
    /// Returns the release velocity, or None when `id` was not being dragged.
    pub fn end(
        &mut self,
        registry: &mut Registry,
        id: EntityId,
        now: Millis,
        config: &SimConfig,
    ) -> Option<Vec2> {
        if self.session.as_ref().is_none_or(|s| s.id != id) {
            log::trace!("Drag end for {id} ignored: not dragged");
            return None;
        }
        let mut session = self.session.take()?;
        registry.release_drag(id);

        let entity = registry.get_mut(id)?;
        let size = entity.effective_size(config.sprite_size);
        let vel = release_velocity(&mut session, entity.pos, size, now, config);
        entity.vel = vel;

        log::debug!(
            "Drag end {id} after {} ms, fling ({:.2}, {:.2})",
            now.saturating_sub(session.started_at),
            vel.x,
            vel.y
        );
        Some(vel)
    }

    /// Gesture interrupted; handled the same way as a release
    pub fn cancel(
        &mut self,
        registry: &mut Registry,
        id: EntityId,
        now: Millis,
        config: &SimConfig,
    ) -> Option<Vec2> {
        self.end(registry, id, now, config)
    }

    /// Forget the session without touching the entity (it is gone)
    pub fn abandon(&mut self, id: EntityId) {
        if self.session.as_ref().is_some_and(|s| s.id == id) {
            self.session = None;
        }
    }
}

/// Fling velocity from the recent move history
///
/// Sums the last few deltas inside the window and divides by the time they
/// span (a lone sample counts as one tick), then converts to pixels per tick
/// and applies the fling multiplier. Without recent samples it falls back to
/// the displacement since the last move. The result is capped and finite.
pub fn release_velocity(
    session: &mut DragSession,
    current_pos: Vec2,
    size: f32,
    now: Millis,
    config: &SimConfig,
) -> Vec2 {
    session.prune(now, config.fling_window_ms);
    let scale = config.tick_secs() * config.fling_multiplier;

    let skip = session.history.len().saturating_sub(config.fling_samples);
    let recent: Vec<DragSample> = session.history.iter().skip(skip).copied().collect();

    let raw = match (recent.first(), recent.last()) {
        (Some(oldest), Some(newest)) => {
            let total: Vec2 = recent.iter().map(|s| s.delta).sum();
            let span = if recent.len() > 1 {
                newest.at.saturating_sub(oldest.at).max(1) as f32
            } else {
                config.tick_ms.max(1) as f32
            };
            total / span * scale
        }
        _ => {
            let elapsed = now.saturating_sub(session.last_at).max(1) as f32;
            let last_pos = session.last_center - Vec2::splat(size / 2.0);
            (current_pos - last_pos) / elapsed * scale
        }
    };

    let vel = sanitize_vec(raw, Vec2::ZERO).clamp_length_max(config.fling_max_speed);
    sanitize_vec(vel, Vec2::ZERO)
}
