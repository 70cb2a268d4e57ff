//! # Entity Interface
//!
//! A detached, self-describing bundle of one entity's components: the id,
//! the presence mask, and one resident value per set mask bit.
//!
//! This is the unit that crosses process boundaries. The registry builds
//! interfaces for outbound snapshots and consumes them when spawning
//! entities from external callers.
//!
//! ## Wire Format
//!
//! ```text
//! +----------------+----------------+------------------------------+
//! | entity_id: i32 | mask: u64 (LE) | components, declaration order|
//! +----------------+----------------+------------------------------+
//! ```
//!
//! Only components whose mask bit is set are present, in ascending
//! [`ComponentKind`] order, with no padding and no per-component length
//! prefix beyond the internal counts of variable-size components.

use std::collections::BTreeMap;

use crate::codec::{WireReader, WireWriter};
use crate::component::{
    Component, ComponentKind, ComponentMask, ConsoleLogs, EntityId, EntityType, FoodItem, Health,
    Inventory, ItemCategory, ItemType, MatterContainer, Metabolism, Moving, Parents, Perception,
    PhysicsStats, Position, TileEffect, TileEffectsList, Velocity,
};
use crate::error::CodecError;

/// Detached component bundle for one entity.
///
/// Invariant: a mask bit is set exactly when the matching slot holds a
/// value. Only [`EntityInterface::set_component`] and
/// [`EntityInterface::remove_component`] touch the mask.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityInterface {
    entity_id: EntityId,
    mask: ComponentMask,
    slots: BTreeMap<ComponentKind, Component>,
}

impl EntityInterface {
    /// Empty interface for an entity id.
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            mask: ComponentMask::empty(),
            slots: BTreeMap::new(),
        }
    }

    /// The entity id this bundle describes.
    #[inline]
    #[must_use]
    pub const fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Rebinds the bundle to another id. Used when spawning from a template.
    pub fn set_entity_id(&mut self, entity_id: EntityId) {
        self.entity_id = entity_id;
    }

    /// The presence mask.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> ComponentMask {
        self.mask
    }

    /// Stores a component, setting its mask bit. Replaces any previous
    /// value of the same kind.
    pub fn set_component(&mut self, component: Component) {
        self.mask.set(component.kind());
        self.slots.insert(component.kind(), component);
    }

    /// Removes a component, clearing its mask bit.
    pub fn remove_component(&mut self, kind: ComponentKind) -> Option<Component> {
        self.mask.clear(kind);
        self.slots.remove(&kind)
    }

    /// Borrow of the component of `kind`, if present.
    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.slots.get(&kind)
    }

    /// Present components in declaration order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.slots.values()
    }

    /// The entity type triple, if present.
    #[must_use]
    pub fn entity_type(&self) -> Option<&EntityType> {
        match self.slots.get(&ComponentKind::EntityType) {
            Some(Component::EntityType(v)) => Some(v),
            _ => None,
        }
    }

    /// The physics stats, if present.
    #[must_use]
    pub fn physics(&self) -> Option<&PhysicsStats> {
        match self.slots.get(&ComponentKind::Physics) {
            Some(Component::Physics(v)) => Some(v),
            _ => None,
        }
    }

    /// The position, if present.
    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        match self.slots.get(&ComponentKind::Position) {
            Some(Component::Position(v)) => Some(v),
            _ => None,
        }
    }

    /// The velocity, if present.
    #[must_use]
    pub fn velocity(&self) -> Option<&Velocity> {
        match self.slots.get(&ComponentKind::Velocity) {
            Some(Component::Velocity(v)) => Some(v),
            _ => None,
        }
    }

    /// The in-flight movement state, if present.
    #[must_use]
    pub fn moving(&self) -> Option<&Moving> {
        match self.slots.get(&ComponentKind::Moving) {
            Some(Component::Moving(v)) => Some(v),
            _ => None,
        }
    }

    /// The health pair, if present.
    #[must_use]
    pub fn health(&self) -> Option<&Health> {
        match self.slots.get(&ComponentKind::Health) {
            Some(Component::Health(v)) => Some(v),
            _ => None,
        }
    }

    /// The perception radii, if present.
    #[must_use]
    pub fn perception(&self) -> Option<&Perception> {
        match self.slots.get(&ComponentKind::Perception) {
            Some(Component::Perception(v)) => Some(v),
            _ => None,
        }
    }

    /// The inventory, if present.
    #[must_use]
    pub fn inventory(&self) -> Option<&Inventory> {
        match self.slots.get(&ComponentKind::Inventory) {
            Some(Component::Inventory(v)) => Some(v),
            _ => None,
        }
    }

    /// The console log ring, if present.
    #[must_use]
    pub fn console_logs(&self) -> Option<&ConsoleLogs> {
        match self.slots.get(&ComponentKind::ConsoleLogs) {
            Some(Component::ConsoleLogs(v)) => Some(v),
            _ => None,
        }
    }

    /// The matter container, if present.
    #[must_use]
    pub fn matter(&self) -> Option<&MatterContainer> {
        match self.slots.get(&ComponentKind::Matter) {
            Some(Component::Matter(v)) => Some(v),
            _ => None,
        }
    }

    /// The item category, if present.
    #[must_use]
    pub fn item_category(&self) -> Option<&ItemCategory> {
        match self.slots.get(&ComponentKind::ItemCategory) {
            Some(Component::ItemCategory(v)) => Some(v),
            _ => None,
        }
    }

    /// The food item payload, if present.
    #[must_use]
    pub fn food_item(&self) -> Option<&FoodItem> {
        match self.slots.get(&ComponentKind::FoodItem) {
            Some(Component::FoodItem(v)) => Some(v),
            _ => None,
        }
    }

    /// The progenitor ids, if present.
    #[must_use]
    pub fn parents(&self) -> Option<&Parents> {
        match self.slots.get(&ComponentKind::Parents) {
            Some(Component::Parents(v)) => Some(v),
            _ => None,
        }
    }

    /// The item type triple, if present.
    #[must_use]
    pub fn item_type(&self) -> Option<&ItemType> {
        match self.slots.get(&ComponentKind::ItemType) {
            Some(Component::ItemType(v)) => Some(v),
            _ => None,
        }
    }

    /// The tile effect, if present.
    #[must_use]
    pub fn tile_effect(&self) -> Option<&TileEffect> {
        match self.slots.get(&ComponentKind::TileEffect) {
            Some(Component::TileEffect(v)) => Some(v),
            _ => None,
        }
    }

    /// The attached tile effect ids, if present.
    #[must_use]
    pub fn tile_effects_list(&self) -> Option<&TileEffectsList> {
        match self.slots.get(&ComponentKind::TileEffectsList) {
            Some(Component::TileEffectsList(v)) => Some(v),
            _ => None,
        }
    }

    /// The metabolism state, if present.
    #[must_use]
    pub fn metabolism(&self) -> Option<&Metabolism> {
        match self.slots.get(&ComponentKind::Metabolism) {
            Some(Component::Metabolism(v)) => Some(v),
            _ => None,
        }
    }

    /// Encodes the bundle into an open writer. Used when embedding entities
    /// inside larger wire structures.
    pub fn encode_into(&self, w: &mut WireWriter) {
        w.write_i32(self.entity_id.0);
        w.write_u64(self.mask.bits());
        for kind in ComponentKind::ALL {
            if self.mask.contains(kind) {
                // The mask/slot invariant guarantees the slot is resident.
                if let Some(component) = self.slots.get(&kind) {
                    encode_component(w, component);
                }
            }
        }
    }

    /// Encodes the bundle into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(16);
        self.encode_into(&mut w);
        w.into_bytes()
    }

    /// Decodes a bundle from an open reader. Fails fast on truncation,
    /// unknown mask bits, or malformed payloads.
    pub fn decode_from(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let entity_id = EntityId(r.read_i32()?);
        let bits = r.read_u64()?;
        let mask = ComponentMask::try_from_bits(bits).ok_or(CodecError::UnknownMask(bits))?;

        let mut slots = BTreeMap::new();
        for kind in ComponentKind::ALL {
            if mask.contains(kind) {
                slots.insert(kind, decode_component(r, kind)?);
            }
        }
        Ok(Self {
            entity_id,
            mask,
            slots,
        })
    }

    /// Decodes a bundle from an exact buffer. Trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = WireReader::new(bytes);
        let decoded = Self::decode_from(&mut r)?;
        if !r.is_exhausted() {
            return Err(CodecError::TrailingBytes(r.remaining()));
        }
        Ok(decoded)
    }
}

/// Writes one component payload. Dispatch is a closed match over the tag.
fn encode_component(w: &mut WireWriter, component: &Component) {
    match component {
        Component::EntityType(v) => w.write_pod(v),
        Component::Physics(v) => w.write_pod(v),
        Component::Position(v) => w.write_pod(v),
        Component::Velocity(v) => w.write_pod(v),
        Component::Moving(v) => w.write_pod(v),
        Component::Health(v) => w.write_pod(v),
        Component::Perception(v) => w.write_pod(v),
        Component::Inventory(v) => {
            w.write_i32(v.max_items);
            w.write_u32(u32::try_from(v.item_ids.len()).unwrap_or(u32::MAX));
            for id in &v.item_ids {
                w.write_i32(id.0);
            }
        }
        Component::ConsoleLogs(v) => {
            w.write_u32(v.max_size);
            w.write_u32(u32::try_from(v.entries.len()).unwrap_or(u32::MAX));
            for (tag, message) in &v.entries {
                w.write_str(tag);
                w.write_str(message);
            }
        }
        Component::Matter(v) => w.write_pod(v),
        Component::ItemCategory(v) => w.write_pod(v),
        Component::FoodItem(v) => w.write_pod(v),
        Component::Parents(v) => w.write_pod(v),
        Component::ItemType(v) => w.write_pod(v),
        Component::TileEffect(v) => w.write_pod(v),
        Component::TileEffectsList(v) => {
            w.write_u32(u32::try_from(v.effect_ids.len()).unwrap_or(u32::MAX));
            for id in &v.effect_ids {
                w.write_i32(id.0);
            }
        }
        Component::Metabolism(v) => w.write_pod(v),
    }
}

/// Reads one component payload of a known kind.
fn decode_component(r: &mut WireReader<'_>, kind: ComponentKind) -> Result<Component, CodecError> {
    Ok(match kind {
        ComponentKind::EntityType => Component::EntityType(r.read_pod()?),
        ComponentKind::Physics => Component::Physics(r.read_pod()?),
        ComponentKind::Position => Component::Position(r.read_pod()?),
        ComponentKind::Velocity => Component::Velocity(r.read_pod()?),
        ComponentKind::Moving => Component::Moving(r.read_pod()?),
        ComponentKind::Health => Component::Health(r.read_pod()?),
        ComponentKind::Perception => Component::Perception(r.read_pod()?),
        ComponentKind::Inventory => {
            let max_items = r.read_i32()?;
            let count = r.read_collection_len()?;
            let mut item_ids = Vec::with_capacity(count as usize);
            for _ in 0..count {
                item_ids.push(EntityId(r.read_i32()?));
            }
            Component::Inventory(Inventory {
                item_ids,
                max_items,
            })
        }
        ComponentKind::ConsoleLogs => {
            let max_size = r.read_u32()?;
            let count = r.read_collection_len()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let tag = r.read_str()?;
                let message = r.read_str()?;
                entries.push((tag, message));
            }
            Component::ConsoleLogs(ConsoleLogs { entries, max_size })
        }
        ComponentKind::Matter => Component::Matter(r.read_pod()?),
        ComponentKind::ItemCategory => Component::ItemCategory(r.read_pod()?),
        ComponentKind::FoodItem => Component::FoodItem(r.read_pod()?),
        ComponentKind::Parents => Component::Parents(r.read_pod()?),
        ComponentKind::ItemType => Component::ItemType(r.read_pod()?),
        ComponentKind::TileEffect => Component::TileEffect(r.read_pod()?),
        ComponentKind::TileEffectsList => {
            let count = r.read_collection_len()?;
            let mut effect_ids = Vec::with_capacity(count as usize);
            for _ in 0..count {
                effect_ids.push(EntityId(r.read_i32()?));
            }
            Component::TileEffectsList(TileEffectsList { effect_ids })
        }
        ComponentKind::Metabolism => Component::Metabolism(r.read_pod()?),
    })
}
