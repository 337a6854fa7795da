//! Type-pair interaction rules
//!
//! Resolves one colliding pair from the point of view of the entity whose
//! update is running (the mover). The mover's motion is tentative and is
//! committed by the caller; the partner's state is written in place.

use glam::Vec2;

use super::collision::{Contact, needs_separation, reflect, reflect_velocity, separation};
use super::state::{Entity, EntityId, EntityKind, scale};
use crate::config::SimConfig;
use crate::consts::CLONE_OFFSET;
use crate::rng::RandomSource;
use crate::{Millis, clamp_to_bounds};

/// Which side of the pair a rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Mover,
    Partner,
}

/// Rule selected for a colliding pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRule {
    /// Stable hit by a family entity: damaging shrink, then a normal bounce
    Damage { stable: Side },
    /// Two Stable entities: both grow, then a normal bounce
    Grow,
    /// Roamer shoves the other entity; no normal bounce
    Roamer { roamer: Side },
    /// Plain bounce (clone spawns possible)
    Generic,
}

impl PairRule {
    pub fn classify(mover: EntityKind, partner: EntityKind) -> Self {
        use EntityKind::*;
        match (mover, partner) {
            (Roamer, Roamer) => PairRule::Generic,
            (Roamer, _) => PairRule::Roamer { roamer: Side::Mover },
            (_, Roamer) => PairRule::Roamer { roamer: Side::Partner },
            (Stable, Stable) => PairRule::Grow,
            (Stable, FamilyA | FamilyB) => PairRule::Damage { stable: Side::Mover },
            (FamilyA | FamilyB, Stable) => PairRule::Damage { stable: Side::Partner },
            _ => PairRule::Generic,
        }
    }
}

/// Tentative position and velocity of the mover for this tick
#[derive(Debug, Clone, Copy)]
pub struct Motion {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// A pair that qualifies for a clone, pending the spawn manager's checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloneRequest {
    pub parents: (EntityId, EntityId),
    pub kinds: (EntityKind, EntityKind),
    /// Top-left of the clone, before clamping into the play area
    pub pos: Vec2,
}

/// What a resolved pair asks of the caller
#[derive(Debug, Clone, Default)]
pub struct PairOutcome {
    /// Entity that reached the removal threshold
    pub removed: Option<EntityId>,
    pub clone: Option<CloneRequest>,
}

/// Shared inputs for resolving pairs within one tick
pub struct PairContext<'a> {
    pub config: &'a SimConfig,
    pub bounds: Vec2,
    pub now: Millis,
    pub rng: &'a mut dyn RandomSource,
}

/// Resolve a colliding pair
///
/// `partner_frozen` marks a partner held by the drag controller: its
/// position and velocity are left alone.
pub fn resolve_pair(
    mover: &mut Entity,
    motion: &mut Motion,
    partner: &mut Entity,
    partner_frozen: bool,
    ctx: &mut PairContext<'_>,
) -> PairOutcome {
    let mut outcome = PairOutcome::default();

    match PairRule::classify(mover.kind, partner.kind) {
        PairRule::Damage { stable } => {
            let target = match stable {
                Side::Mover => &mut *mover,
                Side::Partner => &mut *partner,
            };
            outcome.removed = apply_damage(target, ctx);
            outcome.clone = bounce(mover, motion, partner, partner_frozen, ctx);
        }
        PairRule::Grow => {
            let cfg = ctx.config;
            mover.size_scale = scale::grow(mover.size_scale, cfg.grow_factor, cfg.max_size_scale);
            partner.size_scale =
                scale::grow(partner.size_scale, cfg.grow_factor, cfg.max_size_scale);
            outcome.clone = bounce(mover, motion, partner, partner_frozen, ctx);
        }
        PairRule::Roamer { roamer } => {
            roamer_shove(mover, motion, partner, partner_frozen, roamer, ctx);
        }
        PairRule::Generic => {
            outcome.clone = bounce(mover, motion, partner, partner_frozen, ctx);
        }
    }

    outcome
}

/// Damaging shrink with its per-entity cooldown
///
/// Returns the entity id once its count reaches the removal threshold.
fn apply_damage(stable: &mut Entity, ctx: &PairContext<'_>) -> Option<EntityId> {
    let cfg = ctx.config;
    let ready = stable
        .last_shrink_ms
        .is_none_or(|last| ctx.now.saturating_sub(last) >= cfg.shrink_cooldown_ms);
    if !ready {
        return None;
    }

    stable.size_scale = scale::shrink(stable.size_scale, cfg.shrink_factor, cfg.min_size_scale);
    stable.interaction_count = (stable.interaction_count + 1).min(cfg.removal_threshold);
    stable.last_shrink_ms = Some(ctx.now);
    log::debug!(
        "{} damaged ({}/{}), scale {:.3}",
        stable.id,
        stable.interaction_count,
        cfg.removal_threshold,
        stable.size_scale
    );

    (stable.interaction_count >= cfg.removal_threshold).then_some(stable.id)
}

/// Roamer rule: the roamer keeps its motion, the other entity is mirrored
/// about the contact normal and pushed out past the roamer's minimum distance
fn roamer_shove(
    mover: &mut Entity,
    motion: &mut Motion,
    partner: &mut Entity,
    partner_frozen: bool,
    roamer: Side,
    ctx: &mut PairContext<'_>,
) {
    let cfg = ctx.config;
    let sprite = cfg.sprite_size;
    let avg = (mover.effective_size(sprite) + partner.effective_size(sprite)) / 2.0;

    let (roamer_center, target_center) = match roamer {
        Side::Mover => (mover.center(sprite), partner.center(sprite)),
        Side::Partner => (partner.center(sprite), mover.center(sprite)),
    };
    let contact = Contact::between(roamer_center, target_center, ctx.rng);
    let push = ((avg * cfg.roamer_min_distance - contact.distance) * cfg.roamer_overlap_factor)
        .max(0.0);

    let target = match roamer {
        Side::Mover => &mut *partner,
        Side::Partner => &mut *mover,
    };
    if target.kind == EntityKind::Stable {
        target.size_scale = scale::shrink(target.size_scale, cfg.shrink_factor, cfg.min_size_scale);
    }

    match roamer {
        Side::Mover => {
            if !partner_frozen {
                partner.vel = reflect_velocity(partner.vel, contact.normal);
                let size = partner.effective_size(sprite);
                partner.pos = clamp_to_bounds(partner.pos + contact.normal * push, size, ctx.bounds);
            }
        }
        Side::Partner => {
            motion.vel = reflect_velocity(motion.vel, contact.normal);
            motion.pos = mover.pos + contact.normal * push;
        }
    }
}

/// Generic bounce with overlap correction
///
/// Returns a clone request when at least one side is an original. The
/// request names the parents smaller id first, whichever side is moving.
fn bounce(
    mover: &Entity,
    motion: &mut Motion,
    partner: &mut Entity,
    partner_frozen: bool,
    ctx: &mut PairContext<'_>,
) -> Option<CloneRequest> {
    let cfg = ctx.config;
    let sprite = cfg.sprite_size;
    let partner_size = partner.effective_size(sprite);
    let avg = (mover.effective_size(sprite) + partner_size) / 2.0;

    let center_a = mover.center(sprite);
    let center_b = partner.center(sprite);
    let contact = Contact::between(center_a, center_b, ctx.rng);

    let clone = if mover.is_original || partner.is_original {
        let midpoint = (center_a + center_b) / 2.0;
        let spot = midpoint + contact.normal * (avg * CLONE_OFFSET);
        let (parents, kinds) = if mover.id < partner.id {
            ((mover.id, partner.id), (mover.kind, partner.kind))
        } else {
            ((partner.id, mover.id), (partner.kind, mover.kind))
        };
        Some(CloneRequest {
            parents,
            kinds,
            pos: spot - Vec2::splat(sprite / 2.0),
        })
    } else {
        None
    };

    let (mover_pos, partner_pos) = if needs_separation(contact.distance, avg) {
        let sep = separation(contact.distance, avg);
        motion.pos = mover.pos - contact.normal * sep;
        let partner_pos = if partner_frozen {
            partner.pos
        } else {
            clamp_to_bounds(partner.pos + contact.normal * sep, partner_size, ctx.bounds)
        };
        (motion.pos, partner_pos)
    } else {
        (mover.pos, partner.pos)
    };

    let (mover_vel, partner_vel) = reflect(
        mover_pos,
        motion.vel,
        partner_pos,
        partner.vel,
        avg,
        cfg.base_speed,
        ctx.rng,
    );
    motion.vel = mover_vel;
    if !partner_frozen {
        partner.pos = partner_pos;
        partner.vel = partner_vel;
    }

    clone
}
