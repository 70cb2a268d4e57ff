//! # VERDANT
//!
//! A voxel world simulation kernel in four layers:
//!
//! ```text
//! +------------------------------------------------------+
//! |  verdant_perception   observer views, query dispatch |
//! +------------------------------------------------------+
//! |  verdant_world        tick machine, events, engines  |
//! +------------------------------------------------------+
//! |  verdant_grid         sparse voxel index, snapshots  |
//! +------------------------------------------------------+
//! |  verdant_core         components, codec, registry    |
//! +------------------------------------------------------+
//! ```
//!
//! This crate re-exports the surface most hosts need; reach into the
//! member crates for the rest.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub use verdant_core::{
    entity_type, terrain, Component, ComponentKind, ComponentMask, EntityId, EntityInterface,
    GameClock, Registry, Season,
};
pub use verdant_grid::{
    GridBounds, GridLayer, GridView, TerrainVoxel, VoxelCoord, VoxelGrid, EMPTY_VOXEL,
    OCCLUDED_VOXEL,
};
pub use verdant_perception::{
    create_perception_response, create_perception_responses, PerceptionJob, PerceptionResponse,
    QueryCommand, QueryResponse,
};
pub use verdant_world::{
    EventBus, ScriptedSystem, StatsStore, Subsystem, SubsystemSet, World, WorldConfig, WorldError,
    WorldEvent,
};
