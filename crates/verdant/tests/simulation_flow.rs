//! End-to-end exercise of the full stack: configuration, ticking,
//! engine passes, deferred deletion, and perception responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use verdant::{
    create_perception_response, create_perception_responses, entity_type, terrain, Component,
    EntityId, EntityInterface, EventBus, GameClock, PerceptionJob, PerceptionResponse,
    QueryCommand, Registry, Subsystem, SubsystemSet, TerrainVoxel, VoxelCoord, VoxelGrid, World,
    WorldConfig, OCCLUDED_VOXEL,
};
use verdant_core::{EntityType, Health, Perception, PhysicsStats, Position};
use verdant_perception::command::{channels, commands, params};
use verdant_world::SubsystemError;

fn beast(x: i32, y: i32, z: i32) -> EntityInterface {
    let mut template = EntityInterface::new(EntityId::EMPTY);
    template.set_component(Component::EntityType(EntityType {
        main_type: entity_type::BEAST,
        sub_type0: 0,
        sub_type1: 0,
    }));
    template.set_component(Component::Position(Position::at(x, y, z)));
    template.set_component(Component::Physics(PhysicsStats::default()));
    template.set_component(Component::Health(Health {
        health_level: 100.0,
        max_health: 100.0,
    }));
    template.set_component(Component::Perception(Perception {
        radius_xy: 2,
        radius_z: 1,
    }));
    template
}

fn soil() -> TerrainVoxel {
    TerrainVoxel::anonymous(EntityType {
        main_type: entity_type::TERRAIN,
        sub_type0: terrain::SOIL,
        sub_type1: terrain::FORM_GROUND,
    })
}

fn small_world() -> World {
    let config = WorldConfig::from_toml_str(
        r"
        width = 32
        height = 32
        depth = 8
        perception_batches = 4
        ",
    )
    .unwrap();
    World::new(config).unwrap()
}

#[test]
fn tick_then_perceive_round_trip() {
    let mut world = small_world();
    // A strip of ground under the observer.
    for x in 8..=12 {
        for y in 8..=12 {
            world
                .grid()
                .set_terrain(VoxelCoord::new(x, y, 4), soil())
                .unwrap();
        }
    }
    let observer = world.create_entity(&beast(10, 10, 5)).unwrap();
    let neighbor = world.create_entity(&beast(9, 10, 5)).unwrap();

    assert_eq!(world.update(), 1);
    assert_eq!(world.update(), 2);

    let bytes = create_perception_response(&world, observer, &[]).unwrap();
    let response = PerceptionResponse::from_bytes(&bytes).unwrap();
    assert_eq!(response.entity, observer.0);
    assert_eq!(response.ticks, 2);
    let view = &response.world_view.grid_view;
    // The ground directly below stays visible through the exception.
    assert!(view.terrain_at(VoxelCoord::new(10, 10, 4)) != OCCLUDED_VOXEL);
    assert_eq!(view.entity_at(VoxelCoord::new(9, 10, 5)), neighbor.0);
    assert!(response.world_view.entities.contains_key(&neighbor.0));
}

#[test]
fn move_command_lands_as_force_next_tick() {
    let mut world = small_world();
    let observer = world.create_entity(&beast(10, 10, 5)).unwrap();

    let request = vec![QueryCommand::new(commands::MOVE)
        .with_param(params::X, "3")
        .with_param(params::Y, "-2")];
    let bytes = create_perception_response(&world, observer, &request).unwrap();
    let response = PerceptionResponse::from_bytes(&bytes).unwrap();
    // Side-effecting commands answer on no channel.
    assert!(!response.query_responses.contains_key(&channels::ENTITY_DATA));

    world.update();
    let registry = world.lock_registry();
    let physics = registry.physics(observer).unwrap();
    assert!((physics.force_x - 3.0).abs() < f32::EPSILON);
    assert!((physics.force_y + 2.0).abs() < f32::EPSILON);
}

#[test]
fn entity_data_command_reports_live_entities() {
    let world = small_world();
    let observer = world.create_entity(&beast(10, 10, 5)).unwrap();
    let other = world.create_entity(&beast(15, 15, 5)).unwrap();

    let request = vec![QueryCommand::new(commands::QUERY_ENTITIES_DATA)
        .with_param(params::ENTITY_TYPE_ID, &entity_type::BEAST.to_string())];
    let bytes = create_perception_response(&world, observer, &request).unwrap();
    let response = PerceptionResponse::from_bytes(&bytes).unwrap();
    let Some(verdant::QueryResponse::MapOfMaps(rows)) =
        response.query_responses.get(&channels::ENTITY_DATA)
    else {
        panic!("expected entity data on channel 1");
    };
    assert!(rows.contains_key(&observer.0.to_string()));
    assert!(rows.contains_key(&other.0.to_string()));
}

#[test]
fn deleted_entities_vanish_from_later_views() {
    let mut world = small_world();
    let observer = world.create_entity(&beast(10, 10, 5)).unwrap();
    let victim = world.create_entity(&beast(11, 10, 5)).unwrap();

    world.queue_entity_deletion(victim, false);
    world.update();

    let bytes = create_perception_response(&world, observer, &[]).unwrap();
    let response = PerceptionResponse::from_bytes(&bytes).unwrap();
    assert_eq!(
        response.world_view.grid_view.entity_at(VoxelCoord::new(11, 10, 5)),
        verdant::EMPTY_VOXEL
    );
    assert!(!response.world_view.entities.contains_key(&victim.0));
}

#[test]
fn batch_requests_cover_every_observer() {
    let world = small_world();
    let mut jobs = Vec::new();
    for i in 0..6 {
        let id = world.create_entity(&beast(4 + i * 4, 4, 5)).unwrap();
        jobs.push(PerceptionJob {
            observer: id,
            commands: Vec::new(),
        });
    }
    let responses = create_perception_responses(&world, &jobs);
    assert_eq!(responses.len(), jobs.len());
    for job in &jobs {
        let decoded = PerceptionResponse::from_bytes(&responses[&job.observer.0]).unwrap();
        assert_eq!(decoded.entity, job.observer.0);
    }
}

struct TickCounter {
    passes: Arc<AtomicU64>,
}

impl Subsystem for TickCounter {
    fn name(&self) -> &'static str {
        "tick-counter"
    }

    fn process(
        &self,
        _registry: &mut Registry,
        _grid: &VoxelGrid,
        _bus: &EventBus,
        _clock: &GameClock,
    ) -> Result<(), SubsystemError> {
        self.passes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[test]
fn engine_passes_run_under_the_tick() {
    let mut world = small_world();
    let passes = Arc::new(AtomicU64::new(0));
    world.set_subsystems(SubsystemSet {
        health: Arc::new(TickCounter {
            passes: Arc::clone(&passes),
        }),
        effects: Arc::new(TickCounter {
            passes: Arc::clone(&passes),
        }),
        ..SubsystemSet::default()
    });
    world.update();
    world.update();
    // Two synchronous slots, two ticks.
    assert_eq!(passes.load(Ordering::Relaxed), 4);
}

#[test]
fn concurrent_readers_never_see_half_deleted_entities() {
    let world = small_world();
    let observer = world.create_entity(&beast(5, 5, 2)).unwrap();
    let neighbors: Vec<EntityId> = (0..4)
        .map(|i| world.create_entity(&beast(4 + i, 6, 2)).unwrap())
        .collect();

    std::thread::scope(|scope| {
        let world_ref = &world;
        let reader = scope.spawn(move || {
            for _ in 0..50 {
                let bytes = create_perception_response(world_ref, observer, &[]).unwrap();
                let response = PerceptionResponse::from_bytes(&bytes).unwrap();
                // Every dynamic entity in the view decoded whole.
                for (id, interface) in &response.world_view.entities {
                    if *id >= 0 {
                        assert_eq!(interface.entity_id().0, *id);
                        assert!(interface.position().is_some());
                    }
                }
            }
        });
        for id in &neighbors {
            world_ref.remove_entity(*id).unwrap();
        }
        reader.join().unwrap();
    });

    let bytes = create_perception_response(&world, observer, &[]).unwrap();
    let response = PerceptionResponse::from_bytes(&bytes).unwrap();
    for id in neighbors {
        assert!(!response.world_view.entities.contains_key(&id.0));
    }
}
