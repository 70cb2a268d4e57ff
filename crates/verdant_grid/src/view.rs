//! # Grid View
//!
//! A dense window over the grid, carried inside perception responses.
//! Cells are addressed in world coordinates and stored in local order
//! `x + y * width + z * width * height`. Unset cells read as
//! [`EMPTY_VOXEL`]; occluded terrain cells carry [`OCCLUDED_VOXEL`].

use tracing::warn;
use verdant_core::{CodecError, WireReader, WireWriter};

use crate::coord::{GridBounds, VoxelCoord};
use crate::{EMPTY_VOXEL, OCCLUDED_VOXEL};

/// Dense local window over the terrain and entity layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    width: i32,
    height: i32,
    depth: i32,
    x_offset: i32,
    y_offset: i32,
    z_offset: i32,
    terrain: Vec<i32>,
    entities: Vec<i32>,
}

impl GridView {
    /// Empty view covering `bounds`, every cell [`EMPTY_VOXEL`].
    #[must_use]
    pub fn new(bounds: &GridBounds) -> Self {
        let width = bounds.width().max(0);
        let height = bounds.height().max(0);
        let depth = bounds.depth().max(0);
        let volume = (width as usize) * (height as usize) * (depth as usize);
        Self {
            width,
            height,
            depth,
            x_offset: bounds.min.x,
            y_offset: bounds.min.y,
            z_offset: bounds.min.z,
            terrain: vec![EMPTY_VOXEL; volume],
            entities: vec![EMPTY_VOXEL; volume],
        }
    }

    /// Window extent along X.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Window extent along Y.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Window extent along Z.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> i32 {
        self.depth
    }

    /// World coordinate of the window's minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> VoxelCoord {
        VoxelCoord::new(self.x_offset, self.y_offset, self.z_offset)
    }

    /// World bounds covered by the window.
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        GridBounds {
            min: VoxelCoord::new(self.x_offset, self.y_offset, self.z_offset),
            max: VoxelCoord::new(
                self.x_offset + self.width - 1,
                self.y_offset + self.height - 1,
                self.z_offset + self.depth - 1,
            ),
        }
    }

    fn index(&self, coord: VoxelCoord) -> Option<usize> {
        let lx = coord.x - self.x_offset;
        let ly = coord.y - self.y_offset;
        let lz = coord.z - self.z_offset;
        if lx < 0 || lx >= self.width || ly < 0 || ly >= self.height || lz < 0 || lz >= self.depth {
            return None;
        }
        Some((lx + ly * self.width + lz * self.width * self.height) as usize)
    }

    /// Terrain cell at a world coordinate. [`EMPTY_VOXEL`] outside the
    /// window.
    #[must_use]
    pub fn terrain_at(&self, coord: VoxelCoord) -> i32 {
        self.index(coord).map_or(EMPTY_VOXEL, |i| self.terrain[i])
    }

    /// Writes a terrain cell. Out-of-window writes are dropped with a
    /// warning.
    pub fn set_terrain_at(&mut self, coord: VoxelCoord, value: i32) {
        match self.index(coord) {
            Some(i) => self.terrain[i] = value,
            None => warn!(
                x = coord.x,
                y = coord.y,
                z = coord.z,
                "terrain write outside view window dropped"
            ),
        }
    }

    /// Marks a terrain cell hidden by occlusion.
    pub fn mark_occluded(&mut self, coord: VoxelCoord) {
        self.set_terrain_at(coord, OCCLUDED_VOXEL);
    }

    /// True if the terrain cell is marked occluded.
    #[must_use]
    pub fn is_occluded(&self, coord: VoxelCoord) -> bool {
        self.terrain_at(coord) == OCCLUDED_VOXEL
    }

    /// Entity cell at a world coordinate. [`EMPTY_VOXEL`] outside the
    /// window.
    #[must_use]
    pub fn entity_at(&self, coord: VoxelCoord) -> i32 {
        self.index(coord).map_or(EMPTY_VOXEL, |i| self.entities[i])
    }

    /// Writes an entity cell. Out-of-window writes are dropped with a
    /// warning.
    pub fn set_entity_at(&mut self, coord: VoxelCoord, value: i32) {
        match self.index(coord) {
            Some(i) => self.entities[i] = value,
            None => warn!(
                x = coord.x,
                y = coord.y,
                z = coord.z,
                "entity write outside view window dropped"
            ),
        }
    }

    /// Encodes the window into an open writer.
    pub fn encode_into(&self, w: &mut WireWriter) {
        w.write_i32(self.width);
        w.write_i32(self.height);
        w.write_i32(self.depth);
        w.write_i32(self.x_offset);
        w.write_i32(self.y_offset);
        w.write_i32(self.z_offset);
        for cell in &self.terrain {
            w.write_i32(*cell);
        }
        for cell in &self.entities {
            w.write_i32(*cell);
        }
    }

    /// Decodes a window from an open reader. Fails fast on truncation.
    pub fn decode_from(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let width = r.read_i32()?;
        let height = r.read_i32()?;
        let depth = r.read_i32()?;
        let x_offset = r.read_i32()?;
        let y_offset = r.read_i32()?;
        let z_offset = r.read_i32()?;
        let volume = usize::try_from(width.max(0)).unwrap_or(0)
            * usize::try_from(height.max(0)).unwrap_or(0)
            * usize::try_from(depth.max(0)).unwrap_or(0);
        if volume > verdant_core::codec::MAX_COLLECTION_LEN as usize {
            return Err(CodecError::OversizedCollection {
                count: u32::try_from(volume).unwrap_or(u32::MAX),
                max: verdant_core::codec::MAX_COLLECTION_LEN,
            });
        }
        let mut terrain = Vec::with_capacity(volume);
        for _ in 0..volume {
            terrain.push(r.read_i32()?);
        }
        let mut entities = Vec::with_capacity(volume);
        for _ in 0..volume {
            entities.push(r.read_i32()?);
        }
        Ok(Self {
            width,
            height,
            depth,
            x_offset,
            y_offset,
            z_offset,
            terrain,
            entities,
        })
    }
}
