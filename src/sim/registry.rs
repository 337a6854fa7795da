//! Entity registry
//!
//! The authoritative entity collection plus the process-wide values every
//! entity update consults: the global clone cooldown, the drag claim, the
//! external signals and the play-area bounds.

use glam::Vec2;

use super::state::{Entity, EntityId, EntityKind, Signals};
use crate::Millis;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Live entities, kept sorted by id
    entities: Vec<Entity>,
    next_id: u32,
    last_clone_ms: Option<Millis>,
    dragged: Option<EntityId>,
    signals: Signals,
    bounds: Option<Vec2>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Allocate a fresh id for an entity about to be added
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    /// Insert an entity; an entity with an already-present id replaces it
    pub fn add(&mut self, entity: Entity) {
        self.next_id = self.next_id.max(entity.id.0 + 1);
        match self.entities.binary_search_by_key(&entity.id, |e| e.id) {
            Ok(i) => self.entities[i] = entity,
            Err(i) => self.entities.insert(i, entity),
        }
    }

    /// Remove by identity, returning the removed entity
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let i = self.index_of(id)?;
        if self.dragged == Some(id) {
            self.dragged = None;
        }
        Some(self.entities.remove(i))
    }

    /// Replace the entity with the same id; no-op when it is gone
    pub fn update(&mut self, entity: Entity) {
        if let Some(i) = self.index_of(entity.id) {
            self.entities[i] = entity;
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|i| &self.entities[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(move |i| &mut self.entities[i])
    }

    /// Point-in-time copy, ordered by id
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }

    pub fn count_by_kind(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    // === Global clone cooldown ===

    pub fn last_clone_ms(&self) -> Option<Millis> {
        self.last_clone_ms
    }

    pub fn set_last_clone_ms(&mut self, now: Millis) {
        self.last_clone_ms = Some(now);
    }

    /// Whether a clone spawned less than `window` ms before `now`
    pub fn clone_cooldown_active(&self, now: Millis, window: Millis) -> bool {
        self.last_clone_ms
            .is_some_and(|last| now.saturating_sub(last) < window)
    }

    // === Drag claim ===

    pub fn dragged(&self) -> Option<EntityId> {
        self.dragged
    }

    pub fn is_dragged(&self, id: EntityId) -> bool {
        self.dragged == Some(id)
    }

    /// Claim the single drag slot; fails when another entity holds it or `id` is unknown
    pub fn claim_drag(&mut self, id: EntityId) -> bool {
        if self.dragged.is_some() || self.index_of(id).is_none() {
            return false;
        }
        self.dragged = Some(id);
        true
    }

    /// Release the drag slot if `id` holds it
    pub fn release_drag(&mut self, id: EntityId) -> bool {
        if self.dragged == Some(id) {
            self.dragged = None;
            true
        } else {
            false
        }
    }

    // === External inputs ===

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    pub fn bounds(&self) -> Option<Vec2> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Vec2) {
        self.bounds = Some(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(reg: &mut Registry, kind: EntityKind) -> EntityId {
        let id = reg.allocate_id();
        reg.add(Entity::new(id, kind, Vec2::ZERO, Vec2::ZERO));
        id
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut reg = Registry::new();
        let a = entity(&mut reg, EntityKind::FamilyA);
        let b = entity(&mut reg, EntityKind::FamilyB);
        reg.remove(b);
        let c = entity(&mut reg, EntityKind::Stable);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut reg = Registry::new();
        let a = entity(&mut reg, EntityKind::FamilyA);
        let ghost = Entity::new(EntityId(99), EntityKind::Stable, Vec2::ONE, Vec2::ONE);
        reg.update(ghost);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(EntityId(99)).is_none());

        let mut moved = reg.get(a).unwrap().clone();
        moved.pos = Vec2::new(5.0, 6.0);
        reg.update(moved);
        assert_eq!(reg.get(a).unwrap().pos, Vec2::new(5.0, 6.0));
    }

    #[test]
    fn test_count_by_kind_and_snapshot_order() {
        let mut reg = Registry::new();
        entity(&mut reg, EntityKind::Stable);
        entity(&mut reg, EntityKind::FamilyA);
        entity(&mut reg, EntityKind::Stable);
        assert_eq!(reg.count_by_kind(EntityKind::Stable), 2);
        assert_eq!(reg.count_by_kind(EntityKind::Roamer), 0);

        let snap = reg.snapshot();
        assert!(snap.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_single_drag_claim() {
        let mut reg = Registry::new();
        let a = entity(&mut reg, EntityKind::FamilyA);
        let b = entity(&mut reg, EntityKind::FamilyB);
        assert!(reg.claim_drag(a));
        assert!(!reg.claim_drag(b));
        assert!(!reg.release_drag(b));
        assert!(reg.release_drag(a));
        assert!(reg.claim_drag(b));
        assert!(reg.release_drag(b));
        // Unknown ids never hold the claim
        assert!(!reg.claim_drag(EntityId(42)));
        assert_eq!(reg.dragged(), None);
    }

    #[test]
    fn test_removing_dragged_entity_clears_claim() {
        let mut reg = Registry::new();
        let a = entity(&mut reg, EntityKind::FamilyA);
        assert!(reg.claim_drag(a));
        reg.remove(a);
        assert_eq!(reg.dragged(), None);
    }

    #[test]
    fn test_clone_cooldown_window() {
        let mut reg = Registry::new();
        assert!(!reg.clone_cooldown_active(0, 3000));
        reg.set_last_clone_ms(1000);
        assert!(reg.clone_cooldown_active(3999, 3000));
        assert!(!reg.clone_cooldown_active(4000, 3000));
    }
}
