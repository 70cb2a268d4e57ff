//! # VERDANT Core
//!
//! The authoritative entity model for the VERDANT simulation kernel.
//!
//! ## Layout
//!
//! ```text
//! +-----------------------------------------------------+
//! |  Registry          (live entities, per-kind stores) |
//! +-----------------------------------------------------+
//! |  EntityInterface   (detached component bundle)      |
//! +-----------------------------------------------------+
//! |  WireWriter/Reader (little-endian binary codec)     |
//! +-----------------------------------------------------+
//! ```
//!
//! ## Wire Contract
//!
//! Every entity crosses process boundaries as
//! `{ entity_id: i32, mask: u64 }` followed by each present component in
//! declaration order. The declaration order in [`ComponentKind::ALL`] is
//! frozen; changing it breaks every stored buffer.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod codec;
pub mod component;
pub mod error;
pub mod interface;
pub mod registry;

pub use clock::{GameClock, Season};
pub use component::direction;
pub use codec::{WireReader, WireWriter};
pub use component::{
    Component, ComponentKind, ComponentMask, ConsoleLogs, EntityId, EntityType, FoodItem, Health,
    Inventory, ItemCategory, ItemType, MatterContainer, Metabolism, Moving, Parents, Perception,
    PhysicsStats, Position, TileEffect, TileEffectsList, Velocity, COMPONENT_COUNT,
};
pub use error::{CodecError, StaleEntity};
pub use interface::EntityInterface;
pub use registry::Registry;

/// Main entity types understood by every layer of the kernel.
pub mod entity_type {
    /// Static terrain occupying the terrain layer of the grid.
    pub const TERRAIN: i32 = 0;
    /// Rooted flora. Carries an inventory of produce.
    pub const PLANT: i32 = 1;
    /// Mobile fauna.
    pub const BEAST: i32 = 2;
    /// Transient per-voxel effect entity.
    pub const TILE_EFFECT: i32 = 3;
}

/// Terrain sub-type constants shared by the grid and the perception layer.
pub mod terrain {
    /// No matter at all. Never occludes.
    pub const EMPTY: i32 = 0;
    /// Packed soil.
    pub const SOIL: i32 = 1;
    /// Solid rock.
    pub const ROCK: i32 = 2;
    /// Standing water. Solid for occupancy, transparent for sight.
    pub const WATER: i32 = 3;

    /// Opaque ground form (sub_type1).
    pub const FORM_GROUND: i32 = 0;
    /// Opaque wall form (sub_type1).
    pub const FORM_WALL: i32 = 1;
    /// See-through form (sub_type1), e.g. a lattice.
    pub const FORM_OPEN: i32 = 2;
}
