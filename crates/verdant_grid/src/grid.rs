//! # Voxel Grid
//!
//! The shared spatial index. Four independently locked sparse layers hold
//! the per-voxel state; point accessors take the matching lock for exactly
//! one map operation, and batch call sites take a layer guard once.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;
use verdant_core::EntityId;

use crate::coord::{GridBounds, VoxelCoord};
use crate::error::GridError;
use crate::layer::{OccupancyLayer, ScalarLayer, TerrainLayer, TerrainVoxel};
use crate::EMPTY_VOXEL;

/// Which occupancy layer an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLayer {
    /// The terrain layer.
    Terrain,
    /// The entity occupancy layer.
    Entity,
}

/// Full per-voxel state, read across all four layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelData {
    /// Terrain occupant id, or [`EMPTY_VOXEL`].
    pub terrain_id: i32,
    /// Entity occupant id, or [`EMPTY_VOXEL`].
    pub entity_id: i32,
    /// Event marker, or [`EMPTY_VOXEL`].
    pub event_id: i32,
    /// Lighting level, `0.0` when unset.
    pub lighting: f32,
}

/// Sink notified when terrain is removed from the grid. The orchestrator's
/// event bus implements this; tests plug in recorders.
pub trait TerrainSink {
    /// Called once per removed terrain record, after removal.
    fn terrain_removed(&self, coord: VoxelCoord, voxel: &TerrainVoxel);
}

/// The sparse voxel grid.
#[derive(Debug)]
pub struct VoxelGrid {
    bounds: GridBounds,
    terrain: RwLock<TerrainLayer>,
    entities: RwLock<OccupancyLayer>,
    events: RwLock<ScalarLayer<i32>>,
    lighting: RwLock<ScalarLayer<f32>>,
}

impl VoxelGrid {
    /// Empty grid spanning `[0, w) x [0, h) x [0, d)`.
    #[must_use]
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        Self {
            bounds: GridBounds::with_dimensions(width, height, depth),
            terrain: RwLock::new(TerrainLayer::default()),
            entities: RwLock::new(OccupancyLayer::default()),
            events: RwLock::new(ScalarLayer::new(EMPTY_VOXEL)),
            lighting: RwLock::new(ScalarLayer::new(0.0)),
        }
    }

    /// World bounds.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// True if the coordinate lies inside the world.
    #[inline]
    #[must_use]
    pub const fn contains(&self, coord: VoxelCoord) -> bool {
        self.bounds.contains(coord)
    }

    fn check_bounds(&self, coord: VoxelCoord) -> Result<(), GridError> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds(coord))
        }
    }

    // ---- full-tuple access -------------------------------------------------

    /// Reads the full per-voxel tuple.
    #[must_use]
    pub fn voxel(&self, coord: VoxelCoord) -> VoxelData {
        VoxelData {
            terrain_id: self
                .terrain
                .read()
                .get(coord)
                .map_or(EMPTY_VOXEL, |v| v.id.0),
            entity_id: self.entities.read().get(coord).0,
            event_id: self.events.read().get(coord),
            lighting: self.lighting.read().get(coord),
        }
    }

    /// Writes the full per-voxel tuple. The terrain part is stored as an
    /// anonymous record of the default terrain kind; call
    /// [`VoxelGrid::set_terrain`] for typed terrain.
    pub fn set_voxel(&self, coord: VoxelCoord, data: &VoxelData) -> Result<(), GridError> {
        self.check_bounds(coord)?;
        {
            let mut terrain = self.terrain.write();
            if data.terrain_id == EMPTY_VOXEL {
                terrain.remove(coord);
            } else {
                terrain.set(
                    coord,
                    TerrainVoxel {
                        id: EntityId(data.terrain_id),
                        ..TerrainVoxel::anonymous(verdant_core::EntityType::default())
                    },
                );
            }
        }
        {
            let mut entities = self.entities.write();
            if data.entity_id == EMPTY_VOXEL {
                entities.remove(coord);
            } else {
                entities.set(coord, EntityId(data.entity_id));
            }
        }
        self.events.write().set(coord, data.event_id);
        self.lighting.write().set(coord, data.lighting);
        Ok(())
    }

    // ---- terrain layer -----------------------------------------------------

    /// Terrain record at a coordinate.
    #[must_use]
    pub fn terrain(&self, coord: VoxelCoord) -> Option<TerrainVoxel> {
        self.terrain.read().get(coord).copied()
    }

    /// Terrain occupant id, or [`EMPTY_VOXEL`].
    #[must_use]
    pub fn terrain_id(&self, coord: VoxelCoord) -> i32 {
        self.terrain
            .read()
            .get(coord)
            .map_or(EMPTY_VOXEL, |v| v.id.0)
    }

    /// Stores a terrain record.
    pub fn set_terrain(&self, coord: VoxelCoord, voxel: TerrainVoxel) -> Result<(), GridError> {
        self.check_bounds(coord)?;
        self.terrain.write().set(coord, voxel);
        Ok(())
    }

    /// Removes terrain, notifying the sink. Acquires the terrain lock.
    pub fn delete_terrain(&self, coord: VoxelCoord, sink: &dyn TerrainSink) -> Option<TerrainVoxel> {
        let removed = self.terrain.write().remove(coord);
        if let Some(voxel) = &removed {
            sink.terrain_removed(coord, voxel);
        }
        removed
    }

    /// Removes terrain through an already-held write guard, notifying the
    /// sink. For call sites batching several mutations under one lock.
    pub fn delete_terrain_in(
        layer: &mut TerrainLayer,
        coord: VoxelCoord,
        sink: &dyn TerrainSink,
    ) -> Option<TerrainVoxel> {
        let removed = layer.remove(coord);
        if let Some(voxel) = &removed {
            sink.terrain_removed(coord, voxel);
        }
        removed
    }

    /// Shared guard over the terrain layer.
    #[must_use]
    pub fn terrain_layer(&self) -> RwLockReadGuard<'_, TerrainLayer> {
        self.terrain.read()
    }

    /// Exclusive guard over the terrain layer.
    #[must_use]
    pub fn terrain_layer_mut(&self) -> RwLockWriteGuard<'_, TerrainLayer> {
        self.terrain.write()
    }

    /// Populated terrain cells inside the box. Cost scales with occupant
    /// count, not box volume.
    #[must_use]
    pub fn terrain_in_region(&self, bounds: &GridBounds) -> Vec<(VoxelCoord, TerrainVoxel)> {
        self.terrain
            .read()
            .in_region(bounds)
            .map(|(c, v)| (c, *v))
            .collect()
    }

    // ---- entity layer ------------------------------------------------------

    /// Entity occupant at a coordinate, or [`EntityId::EMPTY`]. Takes the
    /// entity layer lock for one read.
    #[must_use]
    pub fn entity_at(&self, coord: VoxelCoord) -> EntityId {
        self.entities.read().get(coord)
    }

    /// Stores an entity occupant. A displaced previous occupant is logged,
    /// since it indicates a bookkeeping bug upstream.
    pub fn set_entity(&self, coord: VoxelCoord, id: EntityId) -> Result<(), GridError> {
        self.check_bounds(coord)?;
        if let Some(previous) = self.entities.write().set(coord, id) {
            if previous != id {
                warn!(
                    x = coord.x,
                    y = coord.y,
                    z = coord.z,
                    displaced = previous.0,
                    occupant = id.0,
                    "entity occupancy overwritten"
                );
            }
        }
        Ok(())
    }

    /// Clears the entity occupant at a coordinate.
    pub fn clear_entity(&self, coord: VoxelCoord) -> Option<EntityId> {
        self.entities.write().remove(coord)
    }

    /// Moves an entity between voxels under one exclusive guard. The
    /// source occupant must be `id` and the destination must be free,
    /// otherwise the grid is left untouched.
    pub fn move_entity(
        &self,
        from: VoxelCoord,
        to: VoxelCoord,
        id: EntityId,
    ) -> Result<(), GridError> {
        self.check_bounds(to)?;
        let mut entities = self.entities.write();
        let occupant = entities.get(from);
        if occupant != id {
            return Err(GridError::OccupancyMismatch {
                coord: from,
                expected: id.0,
                found: occupant.0,
            });
        }
        let destination = entities.get(to);
        if destination != EntityId::EMPTY {
            return Err(GridError::DestinationOccupied {
                coord: to,
                occupant: destination.0,
            });
        }
        entities.remove(from);
        entities.set(to, id);
        Ok(())
    }

    /// Shared guard over the entity layer, for batched reads.
    #[must_use]
    pub fn entity_layer(&self) -> RwLockReadGuard<'_, OccupancyLayer> {
        self.entities.read()
    }

    /// Exclusive guard over the entity layer, for batched mutations.
    #[must_use]
    pub fn entity_layer_mut(&self) -> RwLockWriteGuard<'_, OccupancyLayer> {
        self.entities.write()
    }

    /// Occupied entity cells inside the box. Cost scales with occupant
    /// count, not box volume.
    #[must_use]
    pub fn entities_in_region(&self, bounds: &GridBounds) -> Vec<(VoxelCoord, EntityId)> {
        self.entities.read().in_region(bounds).collect()
    }

    // ---- event and lighting layers -----------------------------------------

    /// Event marker at a coordinate, or [`EMPTY_VOXEL`].
    #[must_use]
    pub fn event_marker(&self, coord: VoxelCoord) -> i32 {
        self.events.read().get(coord)
    }

    /// Stores an event marker.
    pub fn set_event_marker(&self, coord: VoxelCoord, marker: i32) -> Result<(), GridError> {
        self.check_bounds(coord)?;
        self.events.write().set(coord, marker);
        Ok(())
    }

    /// Lighting level at a coordinate, `0.0` when unset.
    #[must_use]
    pub fn lighting(&self, coord: VoxelCoord) -> f32 {
        self.lighting.read().get(coord)
    }

    /// Stores a lighting level.
    pub fn set_lighting(&self, coord: VoxelCoord, level: f32) -> Result<(), GridError> {
        self.check_bounds(coord)?;
        self.lighting.write().set(coord, level);
        Ok(())
    }

    // ---- snapshot plumbing -------------------------------------------------

    pub(crate) fn layers_for_snapshot(
        &self,
    ) -> (
        RwLockReadGuard<'_, TerrainLayer>,
        RwLockReadGuard<'_, OccupancyLayer>,
        RwLockReadGuard<'_, ScalarLayer<i32>>,
        RwLockReadGuard<'_, ScalarLayer<f32>>,
    ) {
        (
            self.terrain.read(),
            self.entities.read(),
            self.events.read(),
            self.lighting.read(),
        )
    }

    pub(crate) fn layers_for_restore(
        &self,
    ) -> (
        RwLockWriteGuard<'_, TerrainLayer>,
        RwLockWriteGuard<'_, OccupancyLayer>,
        RwLockWriteGuard<'_, ScalarLayer<i32>>,
        RwLockWriteGuard<'_, ScalarLayer<f32>>,
    ) {
        (
            self.terrain.write(),
            self.entities.write(),
            self.events.write(),
            self.lighting.write(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use verdant_core::{entity_type, terrain, EntityType};

    struct Recorder {
        removed: Mutex<Vec<(VoxelCoord, i32)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                removed: Mutex::new(Vec::new()),
            }
        }
    }

    impl TerrainSink for Recorder {
        fn terrain_removed(&self, coord: VoxelCoord, voxel: &TerrainVoxel) {
            self.removed.lock().unwrap().push((coord, voxel.id.0));
        }
    }

    fn rock() -> TerrainVoxel {
        TerrainVoxel::anonymous(EntityType {
            main_type: entity_type::TERRAIN,
            sub_type0: terrain::ROCK,
            sub_type1: terrain::FORM_GROUND,
        })
    }

    #[test]
    fn point_tuple_roundtrip() {
        let grid = VoxelGrid::new(16, 16, 8);
        let coord = VoxelCoord::new(3, 4, 2);
        let data = VoxelData {
            terrain_id: 100,
            entity_id: 200,
            event_id: 7,
            lighting: 0.5,
        };
        grid.set_voxel(coord, &data).unwrap();
        assert_eq!(grid.voxel(coord), data);

        let empty = grid.voxel(VoxelCoord::new(0, 0, 0));
        assert_eq!(empty.terrain_id, EMPTY_VOXEL);
        assert_eq!(empty.entity_id, EMPTY_VOXEL);
    }

    #[test]
    fn out_of_bounds_rejected() {
        let grid = VoxelGrid::new(4, 4, 4);
        let coord = VoxelCoord::new(4, 0, 0);
        assert_eq!(
            grid.set_entity(coord, EntityId(1)),
            Err(GridError::OutOfBounds(coord))
        );
    }

    #[test]
    fn move_entity_checks_source_occupant() {
        let grid = VoxelGrid::new(8, 8, 8);
        let from = VoxelCoord::new(1, 1, 1);
        let to = VoxelCoord::new(2, 1, 1);
        grid.set_entity(from, EntityId(5)).unwrap();

        let err = grid.move_entity(from, to, EntityId(6)).unwrap_err();
        assert_eq!(
            err,
            GridError::OccupancyMismatch {
                coord: from,
                expected: 6,
                found: 5
            }
        );
        // Untouched on failure.
        assert_eq!(grid.entity_at(from), EntityId(5));

        grid.move_entity(from, to, EntityId(5)).unwrap();
        assert_eq!(grid.entity_at(from), EntityId::EMPTY);
        assert_eq!(grid.entity_at(to), EntityId(5));
    }

    #[test]
    fn move_entity_rejects_occupied_destination() {
        let grid = VoxelGrid::new(8, 8, 8);
        let from = VoxelCoord::new(1, 1, 1);
        let to = VoxelCoord::new(2, 1, 1);
        grid.set_entity(from, EntityId(5)).unwrap();
        grid.set_entity(to, EntityId(9)).unwrap();
        let err = grid.move_entity(from, to, EntityId(5)).unwrap_err();
        assert_eq!(
            err,
            GridError::DestinationOccupied {
                coord: to,
                occupant: 9
            }
        );
    }

    #[test]
    fn delete_terrain_notifies_sink() {
        let grid = VoxelGrid::new(8, 8, 8);
        let coord = VoxelCoord::new(2, 2, 2);
        grid.set_terrain(coord, rock()).unwrap();

        let recorder = Recorder::new();
        let removed = grid.delete_terrain(coord, &recorder);
        assert!(removed.is_some());
        assert_eq!(*recorder.removed.lock().unwrap(), vec![(coord, -1)]);

        // Deleting empty terrain does not notify.
        assert!(grid.delete_terrain(coord, &recorder).is_none());
        assert_eq!(recorder.removed.lock().unwrap().len(), 1);
    }

    #[test]
    fn delete_terrain_in_held_guard() {
        let grid = VoxelGrid::new(8, 8, 8);
        let a = VoxelCoord::new(1, 0, 0);
        let b = VoxelCoord::new(2, 0, 0);
        grid.set_terrain(a, rock()).unwrap();
        grid.set_terrain(b, rock()).unwrap();

        let recorder = Recorder::new();
        {
            let mut layer = grid.terrain_layer_mut();
            VoxelGrid::delete_terrain_in(&mut layer, a, &recorder);
            VoxelGrid::delete_terrain_in(&mut layer, b, &recorder);
        }
        assert_eq!(recorder.removed.lock().unwrap().len(), 2);
        assert_eq!(grid.terrain_id(a), EMPTY_VOXEL);
    }

    #[test]
    fn region_queries_cover_exact_window() {
        let grid = VoxelGrid::new(32, 32, 8);
        for x in 0..10 {
            grid.set_entity(VoxelCoord::new(x, x, 0), EntityId(x))
                .unwrap();
        }
        let bounds = GridBounds::new(VoxelCoord::new(2, 2, 0), VoxelCoord::new(5, 5, 0));
        let hits = grid.entities_in_region(&bounds);
        let ids: Vec<_> = hits.iter().map(|(_, id)| id.0).collect();
        assert_eq!(ids, vec![2, 3, 4, 5]);
    }

    #[test]
    fn entity_layer_guard_batches_reads() {
        let grid = VoxelGrid::new(8, 8, 8);
        grid.set_entity(VoxelCoord::new(1, 0, 0), EntityId(1)).unwrap();
        grid.set_entity(VoxelCoord::new(2, 0, 0), EntityId(2)).unwrap();

        let layer = grid.entity_layer();
        assert_eq!(layer.get(VoxelCoord::new(1, 0, 0)), EntityId(1));
        assert_eq!(layer.get(VoxelCoord::new(2, 0, 0)), EntityId(2));
        assert_eq!(layer.get(VoxelCoord::new(3, 0, 0)), EntityId::EMPTY);
    }
}
