//! # Component Model
//!
//! The closed set of component kinds an entity may carry, the presence
//! bitmask, and the component payload types themselves.
//!
//! ## Design
//!
//! - Component kinds are a frozen, numbered enumeration. The bit index of a
//!   kind in the mask equals its discriminant, and the wire encodes present
//!   components in ascending discriminant order.
//! - Fixed-size components are `bytemuck::Pod` and cross the wire as raw
//!   little-endian bytes. Variable-size components carry their own counts.

use bytemuck::{Pod, Zeroable};

/// Number of component kinds. Also the number of meaningful mask bits.
pub const COMPONENT_COUNT: usize = 17;

/// Opaque entity handle. The payload is the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(pub i32);

impl EntityId {
    /// Sentinel for "no entity here".
    pub const EMPTY: Self = Self(-1);

    /// First virtual id handed to anonymous terrain inside a local view.
    /// Subsequent virtual ids count downward.
    pub const VIRTUAL_TERRAIN_BASE: Self = Self(-1000);

    /// Returns true for reserved sentinel ids that never name a live entity.
    #[inline]
    #[must_use]
    pub const fn is_special(self) -> bool {
        self.0 == -1 || self.0 == -2
    }

    /// Returns true for view-local virtual terrain ids.
    #[inline]
    #[must_use]
    pub const fn is_virtual(self) -> bool {
        self.0 <= Self::VIRTUAL_TERRAIN_BASE.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed component enumeration.
///
/// The discriminant is the mask bit index AND the wire order. Frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ComponentKind {
    /// Main/sub type triple classifying the entity.
    EntityType = 0,
    /// Mass, speed limits, accumulated forces, heat.
    Physics = 1,
    /// Voxel position and facing.
    Position = 2,
    /// Per-axis velocity.
    Velocity = 3,
    /// In-flight movement between two voxels.
    Moving = 4,
    /// Current and maximum health.
    Health = 5,
    /// Horizontal and vertical view radii.
    Perception = 6,
    /// Carried item entity ids.
    Inventory = 7,
    /// Ring of human-readable log lines shown to the observer.
    ConsoleLogs = 8,
    /// Matter content by phase.
    Matter = 9,
    /// Coarse item classification.
    ItemCategory = 10,
    /// Edible item payload.
    FoodItem = 11,
    /// Progenitor entity ids.
    Parents = 12,
    /// Main/sub type triple classifying an item.
    ItemType = 13,
    /// A single per-voxel effect.
    TileEffect = 14,
    /// Effect entity ids attached to one voxel.
    TileEffectsList = 15,
    /// Energy reserve bookkeeping.
    Metabolism = 16,
}

impl ComponentKind {
    /// Every kind, in wire order. Frozen.
    pub const ALL: [Self; COMPONENT_COUNT] = [
        Self::EntityType,
        Self::Physics,
        Self::Position,
        Self::Velocity,
        Self::Moving,
        Self::Health,
        Self::Perception,
        Self::Inventory,
        Self::ConsoleLogs,
        Self::Matter,
        Self::ItemCategory,
        Self::FoodItem,
        Self::Parents,
        Self::ItemType,
        Self::TileEffect,
        Self::TileEffectsList,
        Self::Metabolism,
    ];

    /// The mask bit for this kind.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u64 {
        1u64 << (self as u64)
    }

    /// Storage index for this kind.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Presence bitmask over [`ComponentKind`].
///
/// A set bit promises a resident component value; only the owning container
/// (registry or interface) flips bits, and always in lockstep with storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// Bits that correspond to a declared component kind.
    pub const VALID_BITS: u64 = (1u64 << COMPONENT_COUNT as u64) - 1;

    /// Empty mask.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Reconstructs a mask from raw bits. `None` if unknown bits are set.
    #[inline]
    #[must_use]
    pub const fn try_from_bits(bits: u64) -> Option<Self> {
        if bits & !Self::VALID_BITS != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }

    /// Raw bits, for the wire header.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Sets the bit for `kind`.
    #[inline]
    pub fn set(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    /// Clears the bit for `kind`.
    #[inline]
    pub fn clear(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    /// True if the bit for `kind` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// True if no bits are set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

/// Facing and movement directions, stored as raw ints inside Pod components.
pub mod direction {
    /// +Y.
    pub const NORTH: i32 = 0;
    /// +X.
    pub const EAST: i32 = 1;
    /// -Y.
    pub const SOUTH: i32 = 2;
    /// -X.
    pub const WEST: i32 = 3;
    /// +Z.
    pub const UP: i32 = 4;
    /// -Z.
    pub const DOWN: i32 = 5;

    /// Unit force delta for a direction. `None` for out-of-range values.
    #[must_use]
    pub fn unit(dir: i32) -> Option<(f32, f32, f32)> {
        match dir {
            NORTH => Some((0.0, 1.0, 0.0)),
            EAST => Some((1.0, 0.0, 0.0)),
            SOUTH => Some((0.0, -1.0, 0.0)),
            WEST => Some((-1.0, 0.0, 0.0)),
            UP => Some((0.0, 0.0, 1.0)),
            DOWN => Some((0.0, 0.0, -1.0)),
            _ => None,
        }
    }
}

/// Main/sub type triple classifying an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct EntityType {
    /// Coarse class, see [`crate::entity_type`].
    pub main_type: i32,
    /// First refinement, class-specific.
    pub sub_type0: i32,
    /// Second refinement, class-specific.
    pub sub_type1: i32,
}

/// Mass, speed limits, accumulated forces, heat.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct PhysicsStats {
    /// Rest mass in kilograms.
    pub mass: f32,
    /// Speed ceiling in voxels per second.
    pub max_speed: f32,
    /// Speed below which movement snaps to zero.
    pub min_speed: f32,
    /// Accumulated force, X axis.
    pub force_x: f32,
    /// Accumulated force, Y axis.
    pub force_y: f32,
    /// Accumulated force, Z axis.
    pub force_z: f32,
    /// Internal heat in kelvin.
    pub heat: f32,
}

/// Voxel position and facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// Voxel X.
    pub x: i32,
    /// Voxel Y.
    pub y: i32,
    /// Voxel Z.
    pub z: i32,
    /// Facing, see [`direction`].
    pub direction: i32,
}

impl Position {
    /// Position at a voxel, facing north.
    #[must_use]
    pub const fn at(x: i32, y: i32, z: i32) -> Self {
        Self {
            x,
            y,
            z,
            direction: direction::NORTH,
        }
    }
}

/// Per-axis velocity in voxels per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X axis.
    pub vx: f32,
    /// Y axis.
    pub vy: f32,
    /// Z axis.
    pub vz: f32,
}

/// In-flight movement between two voxels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Moving {
    /// Flag bits, see the `FLAG_*` constants.
    pub flags: u32,
    /// Source voxel.
    pub from: [i32; 3],
    /// Destination voxel.
    pub to: [i32; 3],
    /// Velocity at departure.
    pub velocity: [f32; 3],
    /// Tick at which the move completes.
    pub completion_time: i32,
    /// Ticks remaining.
    pub time_remaining: i32,
    /// Facing while moving, see [`direction`].
    pub direction: i32,
}

impl Moving {
    /// The entity is currently between voxels.
    pub const FLAG_MOVING: u32 = 1;
    /// Stop on the X axis when the move completes.
    pub const FLAG_STOP_X: u32 = 1 << 1;
    /// Stop on the Y axis when the move completes.
    pub const FLAG_STOP_Y: u32 = 1 << 2;
    /// Stop on the Z axis when the move completes.
    pub const FLAG_STOP_Z: u32 = 1 << 3;

    /// True while the entity is between voxels.
    #[inline]
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.flags & Self::FLAG_MOVING != 0
    }
}

/// Current and maximum health.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Health {
    /// Current health.
    pub health_level: f32,
    /// Ceiling.
    pub max_health: f32,
}

/// Horizontal and vertical view radii, in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Perception {
    /// Radius along X and Y.
    pub radius_xy: i32,
    /// Radius along Z.
    pub radius_z: i32,
}

/// Carried item entity ids. Variable-size on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inventory {
    /// Item entity ids, in acquisition order.
    pub item_ids: Vec<EntityId>,
    /// Capacity.
    pub max_items: i32,
}

impl Inventory {
    /// Empty inventory with the given capacity.
    #[must_use]
    pub const fn with_capacity(max_items: i32) -> Self {
        Self {
            item_ids: Vec::new(),
            max_items,
        }
    }

    /// True when no further item fits.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.item_ids.len() >= usize::try_from(self.max_items.max(0)).unwrap_or(0)
    }

    /// Adds an item id. Returns false when full or already present.
    pub fn add(&mut self, item: EntityId) -> bool {
        if self.is_full() || self.item_ids.contains(&item) {
            return false;
        }
        self.item_ids.push(item);
        true
    }

    /// Removes an item id. Returns false when absent.
    pub fn remove(&mut self, item: EntityId) -> bool {
        match self.item_ids.iter().position(|i| *i == item) {
            Some(idx) => {
                self.item_ids.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Ring of `(tag, message)` log lines shown to the observer.
/// Variable-size on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleLogs {
    /// Oldest first.
    pub entries: Vec<(String, String)>,
    /// Maximum retained entries; older lines are evicted.
    pub max_size: u32,
}

impl ConsoleLogs {
    /// Empty log ring with the given capacity.
    #[must_use]
    pub const fn with_capacity(max_size: u32) -> Self {
        Self {
            entries: Vec::new(),
            max_size,
        }
    }

    /// Appends a line, evicting the oldest when over capacity.
    pub fn push(&mut self, tag: impl Into<String>, message: impl Into<String>) {
        self.entries.push((tag.into(), message.into()));
        while self.entries.len() > self.max_size as usize {
            self.entries.remove(0);
        }
    }
}

/// Matter content by phase, in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct MatterContainer {
    /// Solid phase.
    pub solid_mass: f32,
    /// Liquid phase.
    pub liquid_mass: f32,
    /// Gaseous phase.
    pub gas_mass: f32,
}

/// Coarse item classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct ItemCategory {
    /// One of the `CATEGORY_*` constants.
    pub category: i32,
}

impl ItemCategory {
    /// Edible.
    pub const FOOD: i32 = 1;
    /// Tool.
    pub const TOOL: i32 = 2;
    /// Weapon.
    pub const WEAPON: i32 = 3;
    /// Armor.
    pub const ARMOR: i32 = 4;
    /// Raw resource.
    pub const RESOURCE: i32 = 5;

    /// True for edible items.
    #[inline]
    #[must_use]
    pub const fn is_food(self) -> bool {
        self.category == Self::FOOD
    }
}

/// Edible item payload.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FoodItem {
    /// Energy per kilogram.
    pub energy_density: f32,
    /// Mass in kilograms.
    pub mass: f32,
    /// Volume in liters.
    pub volume: f32,
    /// Fraction of energy convertible to health.
    pub energy_health_ratio: f32,
    /// Digestion efficiency, 0..=1.
    pub conversion_efficiency: f32,
}

/// Progenitor entity ids. `-1` for unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Parents {
    /// Mother entity id.
    pub mother: i32,
    /// Father entity id.
    pub father: i32,
}

impl Default for Parents {
    fn default() -> Self {
        Self {
            mother: -1,
            father: -1,
        }
    }
}

/// Main/sub type triple classifying an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct ItemType {
    /// Coarse class.
    pub main_type: i32,
    /// First refinement.
    pub sub_type0: i32,
    /// Second refinement.
    pub sub_type1: i32,
}

/// A single per-voxel effect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct TileEffect {
    /// Effect class.
    pub effect_type: i32,
    /// Strength, effect-specific units.
    pub intensity: f32,
    /// Ticks until expiry.
    pub remaining_ticks: i32,
}

/// Effect entity ids attached to one voxel. Variable-size on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileEffectsList {
    /// Attached effect entity ids.
    pub effect_ids: Vec<EntityId>,
}

/// Energy reserve bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Metabolism {
    /// Stored energy.
    pub energy_reserve: f32,
    /// Storage ceiling.
    pub max_energy_reserve: f32,
}

/// A component value tagged with its kind. Closed union; the codec and the
/// registry dispatch over it with exhaustive matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// See [`EntityType`].
    EntityType(EntityType),
    /// See [`PhysicsStats`].
    Physics(PhysicsStats),
    /// See [`Position`].
    Position(Position),
    /// See [`Velocity`].
    Velocity(Velocity),
    /// See [`Moving`].
    Moving(Moving),
    /// See [`Health`].
    Health(Health),
    /// See [`Perception`].
    Perception(Perception),
    /// See [`Inventory`].
    Inventory(Inventory),
    /// See [`ConsoleLogs`].
    ConsoleLogs(ConsoleLogs),
    /// See [`MatterContainer`].
    Matter(MatterContainer),
    /// See [`ItemCategory`].
    ItemCategory(ItemCategory),
    /// See [`FoodItem`].
    FoodItem(FoodItem),
    /// See [`Parents`].
    Parents(Parents),
    /// See [`ItemType`].
    ItemType(ItemType),
    /// See [`TileEffect`].
    TileEffect(TileEffect),
    /// See [`TileEffectsList`].
    TileEffectsList(TileEffectsList),
    /// See [`Metabolism`].
    Metabolism(Metabolism),
}

impl Component {
    /// The kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::EntityType(_) => ComponentKind::EntityType,
            Self::Physics(_) => ComponentKind::Physics,
            Self::Position(_) => ComponentKind::Position,
            Self::Velocity(_) => ComponentKind::Velocity,
            Self::Moving(_) => ComponentKind::Moving,
            Self::Health(_) => ComponentKind::Health,
            Self::Perception(_) => ComponentKind::Perception,
            Self::Inventory(_) => ComponentKind::Inventory,
            Self::ConsoleLogs(_) => ComponentKind::ConsoleLogs,
            Self::Matter(_) => ComponentKind::Matter,
            Self::ItemCategory(_) => ComponentKind::ItemCategory,
            Self::FoodItem(_) => ComponentKind::FoodItem,
            Self::Parents(_) => ComponentKind::Parents,
            Self::ItemType(_) => ComponentKind::ItemType,
            Self::TileEffect(_) => ComponentKind::TileEffect,
            Self::TileEffectsList(_) => ComponentKind::TileEffectsList,
            Self::Metabolism(_) => ComponentKind::Metabolism,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_is_frozen() {
        assert_eq!(ComponentKind::ALL.len(), COMPONENT_COUNT);
        for (i, kind) in ComponentKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        // Spot-check the contract positions.
        assert_eq!(ComponentKind::ALL[0], ComponentKind::EntityType);
        assert_eq!(ComponentKind::ALL[2], ComponentKind::Position);
        assert_eq!(ComponentKind::ALL[16], ComponentKind::Metabolism);
    }

    #[test]
    fn mask_bits_are_unique() {
        let mut seen = 0u64;
        for kind in ComponentKind::ALL {
            assert_eq!(seen & kind.bit(), 0);
            seen |= kind.bit();
        }
        assert_eq!(seen, ComponentMask::VALID_BITS);
    }

    #[test]
    fn mask_set_clear_roundtrip() {
        let mut mask = ComponentMask::empty();
        assert!(mask.is_empty());
        mask.set(ComponentKind::Position);
        mask.set(ComponentKind::Health);
        assert!(mask.contains(ComponentKind::Position));
        assert!(mask.contains(ComponentKind::Health));
        assert!(!mask.contains(ComponentKind::Velocity));
        assert_eq!(mask.count(), 2);
        mask.clear(ComponentKind::Position);
        assert!(!mask.contains(ComponentKind::Position));
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn mask_rejects_unknown_bits() {
        assert!(ComponentMask::try_from_bits(1u64 << 17).is_none());
        assert!(ComponentMask::try_from_bits(u64::MAX).is_none());
        let mask = ComponentMask::try_from_bits(0b101).unwrap();
        assert!(mask.contains(ComponentKind::EntityType));
        assert!(mask.contains(ComponentKind::Position));
    }

    #[test]
    fn inventory_capacity_and_dedup() {
        let mut inv = Inventory::with_capacity(2);
        assert!(inv.add(EntityId(10)));
        assert!(!inv.add(EntityId(10)));
        assert!(inv.add(EntityId(11)));
        assert!(inv.is_full());
        assert!(!inv.add(EntityId(12)));
        assert!(inv.remove(EntityId(10)));
        assert!(!inv.remove(EntityId(10)));
        assert_eq!(inv.item_ids, vec![EntityId(11)]);
    }

    #[test]
    fn console_logs_evict_oldest() {
        let mut logs = ConsoleLogs::with_capacity(2);
        logs.push("sys", "first");
        logs.push("sys", "second");
        logs.push("sys", "third");
        assert_eq!(logs.entries.len(), 2);
        assert_eq!(logs.entries[0].1, "second");
        assert_eq!(logs.entries[1].1, "third");
    }

    #[test]
    fn component_kind_tags_match() {
        let c = Component::Position(Position::at(1, 2, 3));
        assert_eq!(c.kind(), ComponentKind::Position);
        let c = Component::Inventory(Inventory::with_capacity(4));
        assert_eq!(c.kind(), ComponentKind::Inventory);
    }

    #[test]
    fn direction_units_cover_all_axes() {
        assert_eq!(direction::unit(direction::NORTH), Some((0.0, 1.0, 0.0)));
        assert_eq!(direction::unit(direction::DOWN), Some((0.0, 0.0, -1.0)));
        assert_eq!(direction::unit(42), None);
    }
}
