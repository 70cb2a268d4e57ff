//! # Grid Snapshots
//!
//! Whole-grid persistence: populated cells of every layer are encoded with
//! the wire codec and LZ4-compressed with a prepended size. Restore clears
//! the grid and repopulates all four layers.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use verdant_core::{EntityId, WireReader, WireWriter};

use crate::coord::VoxelCoord;
use crate::error::GridError;
use crate::grid::VoxelGrid;
use crate::layer::TerrainVoxel;

fn write_coord(w: &mut WireWriter, coord: VoxelCoord) {
    w.write_i32(coord.x);
    w.write_i32(coord.y);
    w.write_i32(coord.z);
}

fn read_coord(r: &mut WireReader<'_>) -> Result<VoxelCoord, verdant_core::CodecError> {
    Ok(VoxelCoord::new(r.read_i32()?, r.read_i32()?, r.read_i32()?))
}

impl VoxelGrid {
    /// Serializes every populated cell into a compressed buffer.
    #[must_use]
    pub fn to_snapshot_bytes(&self) -> Vec<u8> {
        let (terrain, entities, events, lighting) = self.layers_for_snapshot();

        let mut w = WireWriter::with_capacity(64);
        let bounds = self.bounds();
        write_coord(&mut w, bounds.min);
        write_coord(&mut w, bounds.max);

        w.write_u32(u32::try_from(terrain.len()).unwrap_or(u32::MAX));
        for (coord, voxel) in terrain.iter() {
            write_coord(&mut w, coord);
            w.write_i32(voxel.id.0);
            w.write_pod(&voxel.kind);
            w.write_pod(&voxel.matter);
        }

        w.write_u32(u32::try_from(entities.len()).unwrap_or(u32::MAX));
        for (coord, id) in entities.iter() {
            write_coord(&mut w, coord);
            w.write_i32(id.0);
        }

        w.write_u32(u32::try_from(events.len()).unwrap_or(u32::MAX));
        for (coord, marker) in events.iter() {
            write_coord(&mut w, coord);
            w.write_i32(marker);
        }

        w.write_u32(u32::try_from(lighting.len()).unwrap_or(u32::MAX));
        for (coord, level) in lighting.iter() {
            write_coord(&mut w, coord);
            w.write_f32(level);
        }

        compress_prepend_size(w.as_slice())
    }

    /// Clears the grid and repopulates it from a snapshot buffer.
    ///
    /// The stored bounds are informational; cells outside the grid's own
    /// bounds are restored as-is, matching what was serialized.
    pub fn restore_snapshot(&self, bytes: &[u8]) -> Result<(), GridError> {
        let raw =
            decompress_size_prepended(bytes).map_err(|e| GridError::Decompress(e.to_string()))?;
        let mut r = WireReader::new(&raw);

        // Stored bounds, read and discarded.
        let _min = read_coord(&mut r)?;
        let _max = read_coord(&mut r)?;

        let (mut terrain, mut entities, mut events, mut lighting) = self.layers_for_restore();
        terrain.clear();
        entities.clear();
        events.clear();
        lighting.clear();

        let count = r.read_collection_len()?;
        for _ in 0..count {
            let coord = read_coord(&mut r)?;
            let id = EntityId(r.read_i32()?);
            let kind = r.read_pod()?;
            let matter = r.read_pod()?;
            terrain.set(coord, TerrainVoxel { id, kind, matter });
        }

        let count = r.read_collection_len()?;
        for _ in 0..count {
            let coord = read_coord(&mut r)?;
            entities.set(coord, EntityId(r.read_i32()?));
        }

        let count = r.read_collection_len()?;
        for _ in 0..count {
            let coord = read_coord(&mut r)?;
            events.set(coord, r.read_i32()?);
        }

        let count = r.read_collection_len()?;
        for _ in 0..count {
            let coord = read_coord(&mut r)?;
            lighting.set(coord, r.read_f32()?);
        }

        if !r.is_exhausted() {
            return Err(GridError::Codec(verdant_core::CodecError::TrailingBytes(
                r.remaining(),
            )));
        }
        Ok(())
    }
}
