//! # Grid Layers
//!
//! The sparse per-voxel storage behind [`crate::VoxelGrid`]. Every layer is
//! an ordered map keyed by [`VoxelCoord`], so iteration order is
//! deterministic and region queries cost one walk over the occupied
//! entries.

use std::collections::BTreeMap;

use verdant_core::{EntityId, EntityType, MatterContainer};

use crate::coord::{GridBounds, VoxelCoord};

/// One terrain record. Terrain lives in the grid repository rather than the
/// registry, so a record is self-describing: anonymous terrain carries
/// [`EntityId::EMPTY`] and still has a type and matter content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainVoxel {
    /// Backing entity id, or [`EntityId::EMPTY`] for anonymous terrain.
    pub id: EntityId,
    /// Terrain classification. `main_type` is always the terrain class.
    pub kind: EntityType,
    /// Matter content of the voxel.
    pub matter: MatterContainer,
}

impl TerrainVoxel {
    /// Anonymous terrain of a given kind with default matter.
    #[must_use]
    pub fn anonymous(kind: EntityType) -> Self {
        Self {
            id: EntityId::EMPTY,
            kind,
            matter: MatterContainer::default(),
        }
    }
}

/// Sparse terrain layer.
#[derive(Debug, Default)]
pub struct TerrainLayer {
    cells: BTreeMap<VoxelCoord, TerrainVoxel>,
}

impl TerrainLayer {
    /// Record at a coordinate.
    #[must_use]
    pub fn get(&self, coord: VoxelCoord) -> Option<&TerrainVoxel> {
        self.cells.get(&coord)
    }

    /// Stores a record, replacing any previous one.
    pub fn set(&mut self, coord: VoxelCoord, voxel: TerrainVoxel) {
        self.cells.insert(coord, voxel);
    }

    /// Removes and returns the record at a coordinate.
    pub fn remove(&mut self, coord: VoxelCoord) -> Option<TerrainVoxel> {
        self.cells.remove(&coord)
    }

    /// Populated cells inside the box, ascending coordinate order.
    /// Walks occupied entries only.
    pub fn in_region<'a>(
        &'a self,
        bounds: &'a GridBounds,
    ) -> impl Iterator<Item = (VoxelCoord, &'a TerrainVoxel)> {
        self.cells
            .iter()
            .filter(|(c, _)| bounds.contains(**c))
            .map(|(c, v)| (*c, v))
    }

    /// Number of populated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All populated cells, ascending coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (VoxelCoord, &TerrainVoxel)> {
        self.cells.iter().map(|(c, v)| (*c, v))
    }

    /// Drops every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// Sparse entity occupancy layer. At most one entity id per coordinate.
#[derive(Debug, Default)]
pub struct OccupancyLayer {
    cells: BTreeMap<VoxelCoord, EntityId>,
}

impl OccupancyLayer {
    /// Occupant at a coordinate, or [`EntityId::EMPTY`].
    #[must_use]
    pub fn get(&self, coord: VoxelCoord) -> EntityId {
        self.cells.get(&coord).copied().unwrap_or(EntityId::EMPTY)
    }

    /// Stores an occupant. Returns the displaced id, if any.
    pub fn set(&mut self, coord: VoxelCoord, id: EntityId) -> Option<EntityId> {
        self.cells.insert(coord, id)
    }

    /// Clears a coordinate. Returns the removed id, if any.
    pub fn remove(&mut self, coord: VoxelCoord) -> Option<EntityId> {
        self.cells.remove(&coord)
    }

    /// Occupied cells inside the box, ascending coordinate order.
    /// Walks occupied entries only.
    pub fn in_region<'a>(
        &'a self,
        bounds: &'a GridBounds,
    ) -> impl Iterator<Item = (VoxelCoord, EntityId)> + 'a {
        self.cells
            .iter()
            .filter(|(c, _)| bounds.contains(**c))
            .map(|(c, id)| (*c, *id))
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All occupied cells, ascending coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (VoxelCoord, EntityId)> + '_ {
        self.cells.iter().map(|(c, id)| (*c, *id))
    }

    /// Drops every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// Sparse scalar layer for event markers and lighting.
#[derive(Debug)]
pub struct ScalarLayer<T: Copy> {
    cells: BTreeMap<VoxelCoord, T>,
    default: T,
}

impl<T: Copy> ScalarLayer<T> {
    /// Layer whose unpopulated cells read as `default`.
    #[must_use]
    pub const fn new(default: T) -> Self {
        Self {
            cells: BTreeMap::new(),
            default,
        }
    }

    /// Value at a coordinate, or the layer default.
    #[must_use]
    pub fn get(&self, coord: VoxelCoord) -> T {
        self.cells.get(&coord).copied().unwrap_or(self.default)
    }

    /// Stores a value.
    pub fn set(&mut self, coord: VoxelCoord, value: T) {
        self.cells.insert(coord, value);
    }

    /// Clears a coordinate back to the default.
    pub fn remove(&mut self, coord: VoxelCoord) {
        self.cells.remove(&coord);
    }

    /// Populated cells inside the box, ascending coordinate order.
    pub fn in_region<'a>(
        &'a self,
        bounds: &'a GridBounds,
    ) -> impl Iterator<Item = (VoxelCoord, T)> + 'a {
        self.cells
            .iter()
            .filter(|(c, _)| bounds.contains(**c))
            .map(|(c, v)| (*c, *v))
    }

    /// Number of populated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All populated cells, ascending coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (VoxelCoord, T)> + '_ {
        self.cells.iter().map(|(c, v)| (*c, *v))
    }

    /// Drops every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::entity_type;

    fn rock() -> EntityType {
        EntityType {
            main_type: entity_type::TERRAIN,
            sub_type0: verdant_core::terrain::ROCK,
            sub_type1: verdant_core::terrain::FORM_GROUND,
        }
    }

    #[test]
    fn occupancy_defaults_to_empty() {
        let layer = OccupancyLayer::default();
        assert_eq!(layer.get(VoxelCoord::new(0, 0, 0)), EntityId::EMPTY);
    }

    #[test]
    fn region_query_returns_only_populated() {
        let mut layer = OccupancyLayer::default();
        layer.set(VoxelCoord::new(1, 1, 0), EntityId(10));
        layer.set(VoxelCoord::new(3, 3, 0), EntityId(11));
        layer.set(VoxelCoord::new(50, 50, 0), EntityId(12));

        let bounds = GridBounds::new(VoxelCoord::new(0, 0, 0), VoxelCoord::new(4, 4, 0));
        let hits: Vec<_> = layer.in_region(&bounds).collect();
        assert_eq!(
            hits,
            vec![
                (VoxelCoord::new(1, 1, 0), EntityId(10)),
                (VoxelCoord::new(3, 3, 0), EntityId(11)),
            ]
        );
    }

    #[test]
    fn terrain_region_is_ordered() {
        let mut layer = TerrainLayer::default();
        layer.set(VoxelCoord::new(2, 0, 0), TerrainVoxel::anonymous(rock()));
        layer.set(VoxelCoord::new(0, 0, 0), TerrainVoxel::anonymous(rock()));
        layer.set(VoxelCoord::new(1, 0, 0), TerrainVoxel::anonymous(rock()));

        let bounds = GridBounds::with_dimensions(8, 8, 8);
        let coords: Vec<_> = layer.in_region(&bounds).map(|(c, _)| c.x).collect();
        assert_eq!(coords, vec![0, 1, 2]);
    }

    #[test]
    fn scalar_layer_default_reads() {
        let mut layer = ScalarLayer::new(0.0f32);
        assert!((layer.get(VoxelCoord::new(9, 9, 9)) - 0.0).abs() < f32::EPSILON);
        layer.set(VoxelCoord::new(9, 9, 9), 0.75);
        assert!((layer.get(VoxelCoord::new(9, 9, 9)) - 0.75).abs() < f32::EPSILON);
        layer.remove(VoxelCoord::new(9, 9, 9));
        assert!(layer.is_empty());
    }
}
