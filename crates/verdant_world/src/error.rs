//! # World Error Types

use thiserror::Error;
use verdant_core::ComponentKind;

/// A failed subsystem pass. Collected at the poll site and logged; never
/// fatal to the tick loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubsystemError {
    /// The pass reported a domain failure.
    #[error("subsystem '{system}' failed: {reason}")]
    Failed {
        /// Subsystem name.
        system: String,
        /// What went wrong.
        reason: String,
    },
}

impl SubsystemError {
    /// Shorthand constructor.
    #[must_use]
    pub fn failed(system: &str, reason: impl Into<String>) -> Self {
        Self::Failed {
            system: system.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced to callers of world operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The id does not name a live entity.
    #[error("stale entity id {0}")]
    StaleEntity(i32),

    /// The operation needs a component the entity lacks.
    #[error("entity {entity} missing component {kind:?}")]
    MissingComponent {
        /// The entity.
        entity: i32,
        /// The absent kind.
        kind: ComponentKind,
    },

    /// The grid occupant at the entity's position disagrees with the
    /// registry. Hard error, never silently repaired.
    #[error("grid desync for entity {entity} at ({x}, {y}, {z}): grid holds {found}")]
    GridDesync {
        /// The entity the registry places there.
        entity: i32,
        /// Position X.
        x: i32,
        /// Position Y.
        y: i32,
        /// Position Z.
        z: i32,
        /// Occupant the grid actually holds.
        found: i32,
    },

    /// The addressed voxel holds no entity.
    #[error("no entity at ({x}, {y}, {z})")]
    EmptyVoxel {
        /// Voxel X.
        x: i32,
        /// Voxel Y.
        y: i32,
        /// Voxel Z.
        z: i32,
    },

    /// The operation does not apply to the addressed grid layer.
    #[error("operation unsupported on the terrain layer")]
    UnsupportedLayer,

    /// A grid operation failed.
    #[error(transparent)]
    Grid(#[from] verdant_grid::GridError),

    /// The background runtime could not be built.
    #[error("runtime initialization failed: {0}")]
    Runtime(String),

    /// A configuration file failed to parse.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<verdant_core::StaleEntity> for WorldError {
    fn from(err: verdant_core::StaleEntity) -> Self {
        Self::StaleEntity(err.0)
    }
}
