//! # Entity Registry
//!
//! The authoritative store for live entities. Ids are allocated
//! monotonically and never reused, so a destroyed id stays detectably
//! stale forever. Component storage is one ordered map per kind, which
//! keeps every iteration deterministic.

use std::collections::BTreeMap;

use crate::component::{
    Component, ComponentKind, ComponentMask, ConsoleLogs, EntityId, EntityType, FoodItem, Health,
    Inventory, ItemCategory, ItemType, MatterContainer, Metabolism, Moving, Parents, Perception,
    PhysicsStats, Position, TileEffect, TileEffectsList, Velocity, COMPONENT_COUNT,
};
use crate::error::StaleEntity;
use crate::interface::EntityInterface;

/// Live entity store. One ordered storage map per component kind plus a
/// per-entity mask mirror that always agrees with the storages.
#[derive(Debug, Default)]
pub struct Registry {
    next_id: i32,
    masks: BTreeMap<EntityId, ComponentMask>,
    storages: [BTreeMap<EntityId, Component>; COMPONENT_COUNT],
}

impl Registry {
    /// Empty registry. The first allocated id is 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True when no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// True when `id` names a live entity.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.masks.contains_key(&id)
    }

    /// Allocates a fresh entity with no components.
    pub fn create(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.masks.insert(id, ComponentMask::empty());
        id
    }

    /// Allocates a fresh entity and copies every present component of the
    /// interface into it. Returns the new id.
    pub fn create_from(&mut self, interface: &EntityInterface) -> EntityId {
        let id = self.create();
        for component in interface.components() {
            // The entity was just created, insert cannot fail.
            let _ = self.insert(id, component.clone());
        }
        id
    }

    /// Destroys an entity and all its components.
    pub fn destroy(&mut self, id: EntityId) -> Result<(), StaleEntity> {
        let mask = self.masks.remove(&id).ok_or(StaleEntity(id.0))?;
        for kind in ComponentKind::ALL {
            if mask.contains(kind) {
                self.storages[kind.index()].remove(&id);
            }
        }
        Ok(())
    }

    /// Stores a component on a live entity, setting its mask bit.
    /// Replaces any previous value of the same kind.
    pub fn insert(&mut self, id: EntityId, component: Component) -> Result<(), StaleEntity> {
        let mask = self.masks.get_mut(&id).ok_or(StaleEntity(id.0))?;
        let kind = component.kind();
        mask.set(kind);
        self.storages[kind.index()].insert(id, component);
        Ok(())
    }

    /// Removes a component from an entity, clearing its mask bit.
    pub fn remove(&mut self, id: EntityId, kind: ComponentKind) -> Option<Component> {
        let mask = self.masks.get_mut(&id)?;
        mask.clear(kind);
        self.storages[kind.index()].remove(&id)
    }

    /// Borrow of the component of `kind` on `id`, if both exist.
    #[must_use]
    pub fn get(&self, id: EntityId, kind: ComponentKind) -> Option<&Component> {
        self.storages[kind.index()].get(&id)
    }

    /// Mutable borrow of the component of `kind` on `id`, if both exist.
    pub fn get_mut(&mut self, id: EntityId, kind: ComponentKind) -> Option<&mut Component> {
        self.storages[kind.index()].get_mut(&id)
    }

    /// The presence mask of a live entity.
    #[must_use]
    pub fn mask(&self, id: EntityId) -> Option<ComponentMask> {
        self.masks.get(&id).copied()
    }

    /// Live entity ids in ascending order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.masks.keys().copied()
    }

    /// All `(id, component)` pairs of one kind, in ascending id order.
    pub fn iter_kind(&self, kind: ComponentKind) -> impl Iterator<Item = (EntityId, &Component)> {
        self.storages[kind.index()].iter().map(|(id, c)| (*id, c))
    }

    /// Builds a detached interface holding copies of every present
    /// component. `None` for stale ids.
    #[must_use]
    pub fn interface_of(&self, id: EntityId) -> Option<EntityInterface> {
        let mask = self.mask(id)?;
        let mut iface = EntityInterface::new(id);
        for kind in ComponentKind::ALL {
            if mask.contains(kind) {
                if let Some(component) = self.get(id, kind) {
                    iface.set_component(component.clone());
                }
            }
        }
        Some(iface)
    }

    /// The entity type triple of `id`, if present.
    #[must_use]
    pub fn entity_type(&self, id: EntityId) -> Option<&EntityType> {
        match self.get(id, ComponentKind::EntityType) {
            Some(Component::EntityType(v)) => Some(v),
            _ => None,
        }
    }

    /// The physics stats of `id`, if present.
    #[must_use]
    pub fn physics(&self, id: EntityId) -> Option<&PhysicsStats> {
        match self.get(id, ComponentKind::Physics) {
            Some(Component::Physics(v)) => Some(v),
            _ => None,
        }
    }

    /// Mutable physics stats of `id`, if present.
    pub fn physics_mut(&mut self, id: EntityId) -> Option<&mut PhysicsStats> {
        match self.get_mut(id, ComponentKind::Physics) {
            Some(Component::Physics(v)) => Some(v),
            _ => None,
        }
    }

    /// The position of `id`, if present.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<&Position> {
        match self.get(id, ComponentKind::Position) {
            Some(Component::Position(v)) => Some(v),
            _ => None,
        }
    }

    /// Mutable position of `id`, if present.
    pub fn position_mut(&mut self, id: EntityId) -> Option<&mut Position> {
        match self.get_mut(id, ComponentKind::Position) {
            Some(Component::Position(v)) => Some(v),
            _ => None,
        }
    }

    /// The velocity of `id`, if present.
    #[must_use]
    pub fn velocity(&self, id: EntityId) -> Option<&Velocity> {
        match self.get(id, ComponentKind::Velocity) {
            Some(Component::Velocity(v)) => Some(v),
            _ => None,
        }
    }

    /// The movement state of `id`, if present.
    #[must_use]
    pub fn moving(&self, id: EntityId) -> Option<&Moving> {
        match self.get(id, ComponentKind::Moving) {
            Some(Component::Moving(v)) => Some(v),
            _ => None,
        }
    }

    /// The health pair of `id`, if present.
    #[must_use]
    pub fn health(&self, id: EntityId) -> Option<&Health> {
        match self.get(id, ComponentKind::Health) {
            Some(Component::Health(v)) => Some(v),
            _ => None,
        }
    }

    /// The perception radii of `id`, if present.
    #[must_use]
    pub fn perception(&self, id: EntityId) -> Option<&Perception> {
        match self.get(id, ComponentKind::Perception) {
            Some(Component::Perception(v)) => Some(v),
            _ => None,
        }
    }

    /// The inventory of `id`, if present.
    #[must_use]
    pub fn inventory(&self, id: EntityId) -> Option<&Inventory> {
        match self.get(id, ComponentKind::Inventory) {
            Some(Component::Inventory(v)) => Some(v),
            _ => None,
        }
    }

    /// Mutable inventory of `id`, if present.
    pub fn inventory_mut(&mut self, id: EntityId) -> Option<&mut Inventory> {
        match self.get_mut(id, ComponentKind::Inventory) {
            Some(Component::Inventory(v)) => Some(v),
            _ => None,
        }
    }

    /// The console log ring of `id`, if present.
    #[must_use]
    pub fn console_logs(&self, id: EntityId) -> Option<&ConsoleLogs> {
        match self.get(id, ComponentKind::ConsoleLogs) {
            Some(Component::ConsoleLogs(v)) => Some(v),
            _ => None,
        }
    }

    /// The matter container of `id`, if present.
    #[must_use]
    pub fn matter(&self, id: EntityId) -> Option<&MatterContainer> {
        match self.get(id, ComponentKind::Matter) {
            Some(Component::Matter(v)) => Some(v),
            _ => None,
        }
    }

    /// The item category of `id`, if present.
    #[must_use]
    pub fn item_category(&self, id: EntityId) -> Option<&ItemCategory> {
        match self.get(id, ComponentKind::ItemCategory) {
            Some(Component::ItemCategory(v)) => Some(v),
            _ => None,
        }
    }

    /// The food payload of `id`, if present.
    #[must_use]
    pub fn food_item(&self, id: EntityId) -> Option<&FoodItem> {
        match self.get(id, ComponentKind::FoodItem) {
            Some(Component::FoodItem(v)) => Some(v),
            _ => None,
        }
    }

    /// The progenitor ids of `id`, if present.
    #[must_use]
    pub fn parents(&self, id: EntityId) -> Option<&Parents> {
        match self.get(id, ComponentKind::Parents) {
            Some(Component::Parents(v)) => Some(v),
            _ => None,
        }
    }

    /// The item type triple of `id`, if present.
    #[must_use]
    pub fn item_type(&self, id: EntityId) -> Option<&ItemType> {
        match self.get(id, ComponentKind::ItemType) {
            Some(Component::ItemType(v)) => Some(v),
            _ => None,
        }
    }

    /// The tile effect of `id`, if present.
    #[must_use]
    pub fn tile_effect(&self, id: EntityId) -> Option<&TileEffect> {
        match self.get(id, ComponentKind::TileEffect) {
            Some(Component::TileEffect(v)) => Some(v),
            _ => None,
        }
    }

    /// The attached effect ids of `id`, if present.
    #[must_use]
    pub fn tile_effects_list(&self, id: EntityId) -> Option<&TileEffectsList> {
        match self.get(id, ComponentKind::TileEffectsList) {
            Some(Component::TileEffectsList(v)) => Some(v),
            _ => None,
        }
    }

    /// The metabolism state of `id`, if present.
    #[must_use]
    pub fn metabolism(&self, id: EntityId) -> Option<&Metabolism> {
        match self.get(id, ComponentKind::Metabolism) {
            Some(Component::Metabolism(v)) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beast(reg: &mut Registry, x: i32, y: i32, z: i32) -> EntityId {
        let id = reg.create();
        reg.insert(
            id,
            Component::EntityType(EntityType {
                main_type: crate::entity_type::BEAST,
                sub_type0: 0,
                sub_type1: 0,
            }),
        )
        .unwrap();
        reg.insert(id, Component::Position(Position::at(x, y, z)))
            .unwrap();
        id
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut reg = Registry::new();
        let a = reg.create();
        let b = reg.create();
        assert!(b > a);
        reg.destroy(a).unwrap();
        let c = reg.create();
        assert!(c > b);
        assert!(!reg.contains(a));
    }

    #[test]
    fn destroy_stale_id_errors() {
        let mut reg = Registry::new();
        let id = reg.create();
        reg.destroy(id).unwrap();
        assert_eq!(reg.destroy(id), Err(StaleEntity(id.0)));
        assert_eq!(reg.destroy(EntityId(999)), Err(StaleEntity(999)));
    }

    #[test]
    fn mask_tracks_storage_in_lockstep() {
        let mut reg = Registry::new();
        let id = beast(&mut reg, 1, 1, 0);
        let mask = reg.mask(id).unwrap();
        assert!(mask.contains(ComponentKind::EntityType));
        assert!(mask.contains(ComponentKind::Position));
        assert!(!mask.contains(ComponentKind::Health));

        reg.remove(id, ComponentKind::Position);
        let mask = reg.mask(id).unwrap();
        assert!(!mask.contains(ComponentKind::Position));
        assert!(reg.position(id).is_none());
    }

    #[test]
    fn destroy_clears_all_storages() {
        let mut reg = Registry::new();
        let id = beast(&mut reg, 2, 2, 0);
        reg.insert(
            id,
            Component::Health(Health {
                health_level: 1.0,
                max_health: 1.0,
            }),
        )
        .unwrap();
        reg.destroy(id).unwrap();
        for kind in ComponentKind::ALL {
            assert!(reg.get(id, kind).is_none());
        }
    }

    #[test]
    fn interface_roundtrip_through_registry() {
        let mut reg = Registry::new();
        let id = beast(&mut reg, 4, 5, 6);
        reg.insert(
            id,
            Component::Inventory(Inventory {
                item_ids: vec![EntityId(70)],
                max_items: 2,
            }),
        )
        .unwrap();

        let iface = reg.interface_of(id).unwrap();
        assert_eq!(iface.entity_id(), id);
        assert_eq!(iface.position().unwrap().x, 4);

        let spawned = reg.create_from(&iface);
        assert_ne!(spawned, id);
        assert_eq!(reg.position(spawned), reg.position(id));
        assert_eq!(reg.inventory(spawned), reg.inventory(id));
    }

    #[test]
    fn iteration_is_deterministic_and_ordered() {
        let mut reg = Registry::new();
        let ids: Vec<_> = (0..8).map(|i| beast(&mut reg, i, 0, 0)).collect();
        let seen: Vec<_> = reg
            .iter_kind(ComponentKind::Position)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(seen, ids);
    }

    #[test]
    fn insert_on_stale_entity_errors() {
        let mut reg = Registry::new();
        let id = reg.create();
        reg.destroy(id).unwrap();
        let err = reg.insert(id, Component::Position(Position::at(0, 0, 0)));
        assert_eq!(err, Err(StaleEntity(id.0)));
    }
}
