//! # VERDANT Grid
//!
//! Sparse 3-D voxel index for the simulation kernel.
//!
//! ## Layout
//!
//! ```text
//! +--------------------------------------------------------+
//! |  VoxelGrid                                             |
//! |  +-------------+  +-------------+  +------+  +------+  |
//! |  | terrain     |  | entities    |  |events|  |light |  |
//! |  | RwLock      |  | RwLock      |  |RwLock|  |RwLock|  |
//! |  +-------------+  +-------------+  +------+  +------+  |
//! +--------------------------------------------------------+
//! ```
//!
//! Each layer is an ordered sparse map keyed by [`VoxelCoord`]. Region
//! queries walk the occupied entries only, so an almost-empty box costs
//! almost nothing regardless of its volume.
//!
//! The entity occupancy layer has its own reader/writer lock, deliberately
//! independent of any orchestration lock: hot movement paths take it for
//! exactly as long as one map operation. Call sites that batch several
//! reads take the guard once through [`VoxelGrid::entity_layer`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod coord;
pub mod error;
pub mod grid;
pub mod layer;
pub mod snapshot;
pub mod view;

pub use coord::{GridBounds, VoxelCoord};
pub use error::GridError;
pub use grid::{GridLayer, TerrainSink, VoxelData, VoxelGrid};
pub use layer::{OccupancyLayer, ScalarLayer, TerrainLayer, TerrainVoxel};
pub use view::GridView;

/// Value meaning "no occupant" in any scalar grid cell or view cell.
pub const EMPTY_VOXEL: i32 = -1;

/// Value marking a terrain cell hidden by occlusion inside a local view.
/// Never stored in the grid itself.
pub const OCCLUDED_VOXEL: i32 = -3;
