//! Spawn manager
//!
//! Clone spawns from colliding pairs, condition-triggered Stable spawns on a
//! fixed period, and the initial population. All caps count entities that
//! are live plus those already queued for the end of the tick.

use glam::Vec2;

use super::collision::overlaps;
use super::interaction::CloneRequest;
use super::registry::Registry;
use super::state::{Entity, EntityKind, Signals};
use crate::config::SimConfig;
use crate::rng::RandomSource;
use crate::{Millis, clamp_to_bounds, direction};

/// Speed multiplier a new entity of `kind` starts with
pub fn kind_multiplier(kind: EntityKind, signals: &Signals, config: &SimConfig) -> f32 {
    match kind {
        EntityKind::Roamer => config.roamer_speed_multiplier,
        other => signals.family_multiplier(other).unwrap_or(1.0),
    }
}

/// Random heading at the base speed scaled by `multiplier`
fn launch_velocity(multiplier: f32, config: &SimConfig, rng: &mut dyn RandomSource) -> Vec2 {
    direction(rng.next_angle()) * config.base_speed * multiplier
}

/// Attempt a clone for a qualifying pair
///
/// Honors the global cooldown and the per-kind cap (counting `pending`).
/// On success the global cooldown is restarted and the clone is returned,
/// ready to be queued; the caller stamps the parents.
pub fn try_clone(
    registry: &mut Registry,
    pending: &[Entity],
    request: &CloneRequest,
    config: &SimConfig,
    now: Millis,
    rng: &mut dyn RandomSource,
) -> Option<Entity> {
    if registry.clone_cooldown_active(now, config.clone_cooldown_ms) {
        log::trace!(
            "Clone of {} + {} blocked by cooldown",
            request.parents.0,
            request.parents.1
        );
        return None;
    }

    let (kind_a, kind_b) = request.kinds;
    let kind = if kind_a == kind_b || rng.next_bool() {
        kind_a
    } else {
        kind_b
    };

    let queued = pending.iter().filter(|e| e.kind == kind).count();
    let population = registry.count_by_kind(kind) + queued;
    if population >= config.population_cap(kind) {
        log::trace!("{kind:?} at cap ({population}), clone skipped");
        return None;
    }

    let bounds = registry.bounds()?;
    let multiplier = kind_multiplier(kind, registry.signals(), config);
    let pos = clamp_to_bounds(request.pos, config.sprite_size, bounds);
    let vel = launch_velocity(multiplier, config, rng);

    let id = registry.allocate_id();
    let mut clone = Entity::new(id, kind, pos, vel).with_speed_multiplier(multiplier);
    clone.last_spawn_ms = Some(now);
    registry.set_last_clone_ms(now);

    log::debug!(
        "Clone {id} ({kind:?}) from {} + {} at ({:.1}, {:.1})",
        request.parents.0,
        request.parents.1,
        pos.x,
        pos.y
    );
    Some(clone)
}

/// Random top-left position whose square does not overlap any existing entity
///
/// Gives up after `attempts` tries.
pub fn find_spawn_location<'a>(
    bounds: Vec2,
    sprite_size: f32,
    existing: impl Iterator<Item = &'a Entity> + Clone,
    attempts: u32,
    rng: &mut dyn RandomSource,
) -> Option<Vec2> {
    let range = (bounds - Vec2::splat(sprite_size)).max(Vec2::ZERO);
    for _ in 0..attempts {
        let candidate = Vec2::new(rng.next_f32() * range.x, rng.next_f32() * range.y);
        let clear = existing.clone().all(|e| {
            let side = (sprite_size + e.effective_size(sprite_size)) / 2.0;
            !overlaps(candidate, e.pos, side)
        });
        if clear {
            return Some(candidate);
        }
    }
    None
}

/// Condition-triggered Stable spawn
///
/// Runs once per period; adds the new entity directly since it happens
/// before the per-entity updates of the tick.
pub fn try_condition_spawn(
    registry: &mut Registry,
    config: &SimConfig,
    rng: &mut dyn RandomSource,
) -> Option<Entity> {
    if !registry.signals().spawn_condition {
        return None;
    }
    let population = registry.count_by_kind(EntityKind::Stable);
    if population >= config.max_stable {
        log::trace!("Stable at cap ({population}), condition spawn skipped");
        return None;
    }

    let bounds = registry.bounds()?;
    let Some(pos) = find_spawn_location(
        bounds,
        config.sprite_size,
        registry.iter(),
        config.placement_attempts,
        rng,
    ) else {
        log::warn!(
            "No free spot for a Stable after {} attempts",
            config.placement_attempts
        );
        return None;
    };

    let vel = launch_velocity(1.0, config, rng);
    let entity = Entity::new(registry.allocate_id(), EntityKind::Stable, pos, vel);
    registry.add(entity.clone());
    log::debug!("Stable {} spawned at ({:.1}, {:.1})", entity.id, pos.x, pos.y);
    Some(entity)
}

/// Seed one original per family and the roamer
///
/// Family originals start at fixed fractions of the play area; the roamer
/// starts centered. Returns the entities added.
pub fn seed_population(
    registry: &mut Registry,
    config: &SimConfig,
    rng: &mut dyn RandomSource,
) -> Vec<Entity> {
    let Some(bounds) = registry.bounds() else {
        return Vec::new();
    };
    let room = (bounds - Vec2::splat(config.sprite_size)).max(Vec2::ZERO);

    let mut seeded = Vec::new();
    for (kind, slot) in [
        (EntityKind::FamilyA, Vec2::new(0.0, 0.0)),
        (EntityKind::FamilyB, Vec2::new(1.0, 0.0)),
    ] {
        if registry.count_by_kind(kind) > 0 {
            continue;
        }
        let pos = room * (Vec2::splat(0.25) + slot * 0.5);
        let multiplier = kind_multiplier(kind, registry.signals(), config);
        let vel = launch_velocity(multiplier, config, rng);
        let entity = Entity::new(registry.allocate_id(), kind, pos, vel)
            .original()
            .with_speed_multiplier(multiplier);
        registry.add(entity.clone());
        seeded.push(entity);
    }

    if registry.count_by_kind(EntityKind::Roamer) < config.max_roamer {
        let multiplier = config.roamer_speed_multiplier;
        let vel = launch_velocity(multiplier, config, rng);
        let entity = Entity::new(registry.allocate_id(), EntityKind::Roamer, room / 2.0, vel)
            .original()
            .with_speed_multiplier(multiplier);
        registry.add(entity.clone());
        seeded.push(entity);
    }

    log::info!(
        "Seeded {} entities in {:.0}x{:.0}",
        seeded.len(),
        bounds.x,
        bounds.y
    );
    seeded
}
