//! Response assembly.
//!
//! The pipeline holds the lifecycle lock shared and the tick mutex for
//! the whole assembly, so the view is one consistent cut of the world.
//!
//! ## Occlusion
//!
//! A terrain cell is hidden when its diagonal `(+1, +1, +1)` neighbor is
//! solid opaque terrain, or is itself already hidden in this view. Cells
//! one level below the observer that are cross-adjacent in XY stay
//! visible regardless, so the observer always sees the ground it stands
//! on. Terrain cells are walked in descending coordinate order, which
//! puts each cell's diagonal neighbor before it.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, warn};
use verdant_core::{
    entity_type, terrain, Component, ComponentKind, EntityId, EntityInterface, Position, Registry,
};
use verdant_grid::{GridBounds, GridView, TerrainVoxel, VoxelCoord, VoxelGrid};
use verdant_world::World;

use crate::command::QueryCommand;
use crate::error::PerceptionError;
use crate::handlers::{standard_registry, QueryContext};
use crate::response::{PerceptionResponse, WorldView};

/// One observer plus its query commands, for the batch entry point.
#[derive(Debug, Clone)]
pub struct PerceptionJob {
    /// The observing entity.
    pub observer: EntityId,
    /// Commands to dispatch alongside the view.
    pub commands: Vec<QueryCommand>,
}

/// Assembles and serializes one observer's perception response.
///
/// # Errors
///
/// Fails when the observer is stale or lacks the position, entity type,
/// or perception components.
pub fn create_perception_response(
    world: &World,
    observer: EntityId,
    commands: &[QueryCommand],
) -> Result<Vec<u8>, PerceptionError> {
    let _lifecycle = world.lifecycle_shared();
    let registry = world.lock_registry();
    if !registry.contains(observer) {
        return Err(PerceptionError::StaleObserver(observer.0));
    }
    let pos = *registry
        .position(observer)
        .ok_or(PerceptionError::MissingComponent {
            entity: observer.0,
            kind: ComponentKind::Position,
        })?;
    if registry.entity_type(observer).is_none() {
        return Err(PerceptionError::MissingComponent {
            entity: observer.0,
            kind: ComponentKind::EntityType,
        });
    }
    let reach = *registry
        .perception(observer)
        .ok_or(PerceptionError::MissingComponent {
            entity: observer.0,
            kind: ComponentKind::Perception,
        })?;

    let center = VoxelCoord::from(pos);
    let bounds = GridBounds::around(center, reach.radius_xy, reach.radius_z)
        .intersect(&world.grid().bounds());
    let mut view = GridView::new(&bounds);
    let mut entities: BTreeMap<i32, EntityInterface> = BTreeMap::new();
    let mut next_virtual = EntityId::VIRTUAL_TERRAIN_BASE.0;

    // Terrain pass, descending so each diagonal neighbor is settled first.
    let terrain_cells = world.grid().terrain_in_region(&bounds);
    for (coord, voxel) in terrain_cells.iter().rev() {
        if hidden_by_neighbor(world.grid(), &view, *coord, center) {
            view.mark_occluded(*coord);
            continue;
        }
        let shown = if voxel.id == EntityId::EMPTY {
            let virtual_id = next_virtual;
            next_virtual -= 1;
            entities.insert(virtual_id, anonymous_terrain_interface(virtual_id, *coord, voxel));
            virtual_id
        } else {
            if let Some(interface) = visible_interface(&registry, voxel.id) {
                entities.insert(voxel.id.0, interface);
            }
            voxel.id.0
        };
        view.set_terrain_at(*coord, shown);
    }

    // Entity pass over the occupancy layer.
    for (coord, id) in world.grid().entities_in_region(&bounds) {
        view.set_entity_at(coord, id.0);
        if let Some(interface) = visible_interface(&registry, id) {
            entities.insert(id.0, interface);
        }
    }

    // The observer sees itself unfiltered.
    if let Some(full) = registry.interface_of(observer) {
        entities.insert(observer.0, full);
    }
    let items_entities = carried_item_details(&registry, observer);

    let ctx = QueryContext {
        registry: &registry,
        stats: world.stats(),
        bus: world.bus(),
        observer,
    };
    let query_responses = standard_registry().dispatch(commands, &ctx);

    let response = PerceptionResponse {
        entity: observer.0,
        world_view: WorldView {
            grid_view: view,
            entities,
        },
        ticks: world.clock().ticks(),
        items_entities,
        query_responses,
    };
    debug!(
        observer = observer.0,
        entities = response.world_view.entities.len(),
        "perception response assembled"
    );
    Ok(response.to_bytes())
}

/// Assembles responses for many observers, fanned out over scoped
/// worker threads in fixed-size batches. A failed job is logged and
/// yields an empty buffer; its siblings still complete. Results are
/// keyed by raw observer id.
#[must_use]
pub fn create_perception_responses(
    world: &World,
    jobs: &[PerceptionJob],
) -> BTreeMap<i32, Vec<u8>> {
    if jobs.is_empty() {
        return BTreeMap::new();
    }
    let batches = world.config().perception_batches.max(1);
    let chunk = jobs.len().div_ceil(batches).max(1);
    let results = Mutex::new(BTreeMap::new());
    let results_ref = &results;
    std::thread::scope(|scope| {
        for batch in jobs.chunks(chunk) {
            scope.spawn(move || {
                for job in batch {
                    match create_perception_response(world, job.observer, &job.commands) {
                        Ok(bytes) => {
                            results_ref.lock().insert(job.observer.0, bytes);
                        }
                        Err(e) => {
                            warn!(observer = job.observer.0, error = %e, "perception job failed");
                            results_ref.lock().insert(job.observer.0, Vec::new());
                        }
                    }
                }
            });
        }
    });
    results.into_inner()
}

/// Solid opaque terrain blocks the view; empty and water cells do not,
/// and neither do open forms.
fn is_solid_opaque(voxel: &TerrainVoxel) -> bool {
    voxel.kind.main_type == entity_type::TERRAIN
        && voxel.kind.sub_type0 != terrain::EMPTY
        && voxel.kind.sub_type0 != terrain::WATER
        && (voxel.kind.sub_type1 == terrain::FORM_GROUND
            || voxel.kind.sub_type1 == terrain::FORM_WALL)
}

fn hidden_by_neighbor(
    grid: &VoxelGrid,
    view: &GridView,
    coord: VoxelCoord,
    center: VoxelCoord,
) -> bool {
    // Ground-level exception: cells one level below the observer that
    // are cross-adjacent in XY stay visible.
    if coord.z == center.z - 1 {
        let dx = coord.x - center.x;
        let dy = coord.y - center.y;
        let cross_adjacent =
            (dx == 0 && dy == 0) || (dx.abs() == 1 && dy == 0) || (dx == 0 && dy.abs() == 1);
        if cross_adjacent {
            return false;
        }
    }
    let neighbor = coord.offset(1, 1, 1);
    if view.is_occluded(neighbor) {
        return true;
    }
    grid.terrain(neighbor)
        .is_some_and(|voxel| is_solid_opaque(&voxel))
}

fn anonymous_terrain_interface(
    virtual_id: i32,
    coord: VoxelCoord,
    voxel: &TerrainVoxel,
) -> EntityInterface {
    let mut interface = EntityInterface::new(EntityId(virtual_id));
    interface.set_component(Component::EntityType(voxel.kind));
    interface.set_component(Component::Position(Position::at(coord.x, coord.y, coord.z)));
    interface.set_component(Component::Matter(voxel.matter));
    interface
}

/// Observers receive a type-dependent slice of each visible entity:
/// position and type always, motion and health for mobile kinds,
/// inventories only for plants, matter only for terrain.
fn visible_interface(registry: &Registry, id: EntityId) -> Option<EntityInterface> {
    let full = registry.interface_of(id)?;
    let main = full.entity_type().map_or(entity_type::BEAST, |t| t.main_type);
    let mut out = EntityInterface::new(id);
    copy_components(&full, &mut out, &[ComponentKind::EntityType, ComponentKind::Position]);
    if main == entity_type::TERRAIN {
        copy_components(&full, &mut out, &[ComponentKind::Matter]);
    } else {
        copy_components(
            &full,
            &mut out,
            &[
                ComponentKind::Velocity,
                ComponentKind::Moving,
                ComponentKind::Health,
            ],
        );
        if main == entity_type::PLANT {
            copy_components(&full, &mut out, &[ComponentKind::Inventory]);
        }
    }
    Some(out)
}

fn carried_item_details(registry: &Registry, observer: EntityId) -> BTreeMap<i32, EntityInterface> {
    let mut items = BTreeMap::new();
    let Some(inventory) = registry.inventory(observer) else {
        return items;
    };
    for item_id in &inventory.item_ids {
        let Some(full) = registry.interface_of(*item_id) else {
            warn!(observer = observer.0, item = item_id.0, "inventory holds a stale item id");
            continue;
        };
        let mut out = EntityInterface::new(*item_id);
        copy_components(
            &full,
            &mut out,
            &[
                ComponentKind::EntityType,
                ComponentKind::ItemCategory,
                ComponentKind::ItemType,
                ComponentKind::FoodItem,
            ],
        );
        items.insert(item_id.0, out);
    }
    items
}

fn copy_components(from: &EntityInterface, to: &mut EntityInterface, kinds: &[ComponentKind]) {
    for kind in kinds {
        if let Some(component) = from.component(*kind) {
            to.set_component(component.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::{
        EntityType, FoodItem, Health, Inventory, ItemCategory, ItemType, Perception, PhysicsStats,
    };
    use verdant_grid::OCCLUDED_VOXEL;
    use verdant_world::WorldConfig;

    fn test_world() -> World {
        World::new(WorldConfig {
            width: 32,
            height: 32,
            depth: 8,
            ..WorldConfig::default()
        })
        .unwrap()
    }

    fn observer_template(x: i32, y: i32, z: i32) -> EntityInterface {
        let mut template = EntityInterface::new(EntityId::EMPTY);
        template.set_component(Component::EntityType(EntityType {
            main_type: entity_type::BEAST,
            sub_type0: 0,
            sub_type1: 0,
        }));
        template.set_component(Component::Position(Position::at(x, y, z)));
        template.set_component(Component::Physics(PhysicsStats::default()));
        template.set_component(Component::Perception(Perception {
            radius_xy: 2,
            radius_z: 1,
        }));
        template
    }

    fn solid_soil() -> TerrainVoxel {
        TerrainVoxel::anonymous(EntityType {
            main_type: entity_type::TERRAIN,
            sub_type0: terrain::SOIL,
            sub_type1: terrain::FORM_GROUND,
        })
    }

    fn water() -> TerrainVoxel {
        TerrainVoxel::anonymous(EntityType {
            main_type: entity_type::TERRAIN,
            sub_type0: terrain::WATER,
            sub_type1: terrain::FORM_GROUND,
        })
    }

    #[test]
    fn observer_needs_perception_components() {
        let world = test_world();
        let err = create_perception_response(&world, EntityId(99), &[]).unwrap_err();
        assert!(matches!(err, PerceptionError::StaleObserver(99)));

        let mut blind = observer_template(5, 5, 5);
        let _ = blind.remove_component(ComponentKind::Perception);
        let id = world.create_entity(&blind).unwrap();
        let err = create_perception_response(&world, id, &[]).unwrap_err();
        assert!(matches!(
            err,
            PerceptionError::MissingComponent {
                kind: ComponentKind::Perception,
                ..
            }
        ));
    }

    #[test]
    fn window_clamps_to_the_grid() {
        let world = test_world();
        let id = world.create_entity(&observer_template(0, 0, 0)).unwrap();
        let bytes = create_perception_response(&world, id, &[]).unwrap();
        let response = PerceptionResponse::from_bytes(&bytes).unwrap();
        let grid_view = &response.world_view.grid_view;
        assert_eq!(grid_view.origin(), VoxelCoord::new(0, 0, 0));
        assert_eq!(grid_view.width(), 3);
        assert_eq!(grid_view.depth(), 2);
    }

    #[test]
    fn diagonal_neighbor_occludes_with_ground_exception() {
        let world = test_world();
        let id = world.create_entity(&observer_template(10, 10, 5)).unwrap();
        world.grid().set_terrain(VoxelCoord::new(10, 10, 4), solid_soil()).unwrap();
        world.grid().set_terrain(VoxelCoord::new(11, 11, 5), solid_soil()).unwrap();
        world.grid().set_terrain(VoxelCoord::new(12, 12, 6), solid_soil()).unwrap();

        let bytes = create_perception_response(&world, id, &[]).unwrap();
        let response = PerceptionResponse::from_bytes(&bytes).unwrap();
        let grid_view = &response.world_view.grid_view;

        // Hidden behind the solid cell at (12, 12, 6).
        assert_eq!(grid_view.terrain_at(VoxelCoord::new(11, 11, 5)), OCCLUDED_VOXEL);
        // Directly below the observer, so the exception keeps it visible
        // even with a solid diagonal neighbor.
        let below = grid_view.terrain_at(VoxelCoord::new(10, 10, 4));
        assert!(below <= EntityId::VIRTUAL_TERRAIN_BASE.0, "got {below}");
        // Nothing above it, so visible.
        let far = grid_view.terrain_at(VoxelCoord::new(12, 12, 6));
        assert!(far <= EntityId::VIRTUAL_TERRAIN_BASE.0, "got {far}");
        // Every visible virtual id has a component bundle.
        assert!(response.world_view.entities.contains_key(&below));
        assert!(response.world_view.entities.contains_key(&far));
    }

    #[test]
    fn occlusion_propagates_through_hidden_cells() {
        let world = test_world();
        let id = world.create_entity(&observer_template(10, 10, 5)).unwrap();
        // Water at (10, 10, 5) is transparent, but it is itself hidden
        // by the solid cell above, and that hiding carries down.
        world.grid().set_terrain(VoxelCoord::new(9, 9, 4), solid_soil()).unwrap();
        world.grid().set_terrain(VoxelCoord::new(10, 10, 5), water()).unwrap();
        world.grid().set_terrain(VoxelCoord::new(11, 11, 6), solid_soil()).unwrap();

        let bytes = create_perception_response(&world, id, &[]).unwrap();
        let response = PerceptionResponse::from_bytes(&bytes).unwrap();
        let grid_view = &response.world_view.grid_view;
        assert_eq!(grid_view.terrain_at(VoxelCoord::new(10, 10, 5)), OCCLUDED_VOXEL);
        assert_eq!(grid_view.terrain_at(VoxelCoord::new(9, 9, 4)), OCCLUDED_VOXEL);
        assert!(grid_view.terrain_at(VoxelCoord::new(11, 11, 6)) <= EntityId::VIRTUAL_TERRAIN_BASE.0);
    }

    #[test]
    fn nearby_entities_are_filtered_by_type() {
        let world = test_world();
        let observer = world.create_entity(&observer_template(10, 10, 5)).unwrap();

        let mut other = observer_template(9, 10, 5);
        other.set_component(Component::Health(Health {
            health_level: 50.0,
            max_health: 100.0,
        }));
        other.set_component(Component::Inventory(Inventory::with_capacity(2)));
        let other_id = world.create_entity(&other).unwrap();

        let bytes = create_perception_response(&world, observer, &[]).unwrap();
        let response = PerceptionResponse::from_bytes(&bytes).unwrap();
        assert_eq!(
            response.world_view.grid_view.entity_at(VoxelCoord::new(9, 10, 5)),
            other_id.0
        );
        let seen = response.world_view.entities.get(&other_id.0).unwrap();
        // Beasts show health but never their inventories or perception.
        assert!(seen.health().is_some());
        assert!(seen.inventory().is_none());
        assert!(seen.perception().is_none());
        // The observer sees its own bundle unfiltered.
        let own = response.world_view.entities.get(&observer.0).unwrap();
        assert!(own.perception().is_some());
    }

    #[test]
    fn carried_items_ship_their_details() {
        let world = test_world();
        let mut apple = EntityInterface::new(EntityId::EMPTY);
        apple.set_component(Component::ItemCategory(ItemCategory {
            category: ItemCategory::FOOD,
        }));
        apple.set_component(Component::ItemType(ItemType::default()));
        apple.set_component(Component::FoodItem(FoodItem::default()));
        let apple_id = world.create_entity(&apple).unwrap();

        let mut template = observer_template(10, 10, 5);
        let mut inventory = Inventory::with_capacity(4);
        assert!(inventory.add(apple_id));
        template.set_component(Component::Inventory(inventory));
        let observer = world.create_entity(&template).unwrap();

        let bytes = create_perception_response(&world, observer, &[]).unwrap();
        let response = PerceptionResponse::from_bytes(&bytes).unwrap();
        let item = response.items_entities.get(&apple_id.0).unwrap();
        assert!(item.item_category().is_some());
        assert!(item.food_item().is_some());
    }

    #[test]
    fn commands_ride_along_with_the_view() {
        use crate::command::{channels, commands, params};

        let world = test_world();
        let observer = world.create_entity(&observer_template(10, 10, 5)).unwrap();
        world.stats().put("population_size", 3, 5.0);

        let requests = vec![
            QueryCommand::new(commands::GET_AI_STATISTICS),
            QueryCommand::new(commands::MOVE).with_param(params::X, "1"),
        ];
        let bytes = create_perception_response(&world, observer, &requests).unwrap();
        let response = PerceptionResponse::from_bytes(&bytes).unwrap();
        assert!(response.query_responses.contains_key(&channels::AI_STATISTICS));
        // The move command produced a queued event, not a response.
        assert_eq!(world.bus().pending(), 1);
    }

    #[test]
    fn batch_isolates_failed_jobs() {
        let world = test_world();
        let a = world.create_entity(&observer_template(5, 5, 5)).unwrap();
        let b = world.create_entity(&observer_template(20, 20, 5)).unwrap();
        let jobs = vec![
            PerceptionJob { observer: a, commands: Vec::new() },
            PerceptionJob { observer: EntityId(9999), commands: Vec::new() },
            PerceptionJob { observer: b, commands: Vec::new() },
        ];
        let responses = create_perception_responses(&world, &jobs);
        assert_eq!(responses.len(), 3);
        let decoded = PerceptionResponse::from_bytes(&responses[&a.0]).unwrap();
        assert_eq!(decoded.entity, a.0);
        assert!(!responses[&b.0].is_empty());
        assert!(responses[&9999].is_empty());
    }
}
