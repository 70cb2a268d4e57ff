//! # Grid Error Types

use thiserror::Error;

use crate::coord::VoxelCoord;

/// Errors raised by grid operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A coordinate fell outside the world bounds.
    #[error("coordinate ({}, {}, {}) is outside the grid", .0.x, .0.y, .0.z)]
    OutOfBounds(VoxelCoord),

    /// The occupant found at a coordinate was not the entity the caller
    /// claimed to move. The grid is left untouched.
    #[error("occupancy mismatch at ({}, {}, {}): expected {expected}, found {found}", .coord.x, .coord.y, .coord.z)]
    OccupancyMismatch {
        /// The contested coordinate.
        coord: VoxelCoord,
        /// Id the caller expected.
        expected: i32,
        /// Id actually stored.
        found: i32,
    },

    /// A move targeted an already occupied voxel.
    #[error("destination ({}, {}, {}) already occupied by {occupant}", .coord.x, .coord.y, .coord.z)]
    DestinationOccupied {
        /// The occupied destination.
        coord: VoxelCoord,
        /// Id already stored there.
        occupant: i32,
    },

    /// A snapshot buffer failed to decompress.
    #[error("snapshot decompression failed: {0}")]
    Decompress(String),

    /// A snapshot buffer failed to decode.
    #[error(transparent)]
    Codec(#[from] verdant_core::CodecError),
}
