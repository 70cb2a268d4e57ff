//! # Tick Machine
//!
//! [`World`] owns everything the simulation shares: the registry behind
//! the tick mutex, the voxel grid, the event bus, the clock, and the
//! lifecycle lock. Each [`World::update`] call advances the clock, runs
//! the synchronous engine passes in a fixed order under the tick mutex,
//! then handles deferred deletions and relaunches the background passes.
//!
//! Deletion is deferred by design: engines and command handlers enqueue
//! kill events, the bus flush collects them, and the ids are destroyed
//! only once no background pass is outstanding, under the exclusive
//! lifecycle lock. Perception readers holding the lock shared therefore
//! never observe a half-deleted entity.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use verdant_core::{
    direction, entity_type, Component, ComponentKind, EntityId, EntityInterface, GameClock,
    Registry,
};
use verdant_grid::{GridLayer, TerrainVoxel, VoxelCoord, VoxelGrid};

use crate::config::WorldConfig;
use crate::error::{SubsystemError, WorldError};
use crate::events::{EventBus, FlushCtx, WorldEvent, WorldEventKind};
use crate::stats::{MemoryStatsStore, StatsStore};
use crate::subsystem::{BackgroundCtx, Subsystem, SubsystemSet};

/// A host-provided system run synchronously at the end of each tick,
/// after the engine passes and still under the tick mutex.
pub trait ScriptedSystem: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    /// One pass over the world state.
    fn update(&mut self, registry: &mut Registry, grid: &VoxelGrid, bus: &EventBus, clock: &GameClock);
}

/// State shared between the orchestrator, background workers, and
/// perception readers.
struct Shared {
    registry: Mutex<Registry>,
    grid: VoxelGrid,
    bus: EventBus,
    clock: GameClock,
    lifecycle: RwLock<()>,
}

/// One background worker slot with its last launched pass.
struct BackgroundSlot {
    name: &'static str,
    handle: Option<JoinHandle<Result<(), SubsystemError>>>,
}

impl BackgroundSlot {
    const fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

const SLOT_PHYSICS: usize = 0;
const SLOT_ECOSYSTEM: usize = 1;
const SLOT_METABOLISM: usize = 2;

/// The simulation orchestrator.
pub struct World {
    config: WorldConfig,
    shared: Arc<Shared>,
    stats: Arc<dyn StatsStore>,
    subsystems: SubsystemSet,
    scripted: Vec<Box<dyn ScriptedSystem>>,
    pending_deletions: Vec<(EntityId, bool)>,
    slots: [BackgroundSlot; 3],
    runtime: Runtime,
}

impl World {
    /// Builds a world from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] for degenerate dimensions and
    /// [`WorldError::Runtime`] if the worker runtime cannot start.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        if config.width <= 0 || config.height <= 0 || config.depth <= 0 {
            return Err(WorldError::Config(format!(
                "world dimensions must be positive, got {}x{}x{}",
                config.width, config.height, config.depth
            )));
        }
        if config.perception_batches == 0 {
            return Err(WorldError::Config(
                "perception_batches must be at least 1".into(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("verdant-worker")
            .build()
            .map_err(|e| WorldError::Runtime(e.to_string()))?;
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::new()),
            grid: VoxelGrid::new(config.width, config.height, config.depth),
            bus: EventBus::new(),
            clock: GameClock::new(),
            lifecycle: RwLock::new(()),
        });

        // Kill events are collected at flush time and destroyed later,
        // once no background pass is outstanding.
        shared.bus.subscribe(
            WorldEventKind::KillEntity,
            Box::new(|event, ctx| {
                if let WorldEvent::KillEntity { entity, soft } = event {
                    ctx.deletions.push((*entity, *soft));
                }
            }),
        );
        // Movement requests fold into the physics force accumulators;
        // the physics pass turns them into motion.
        shared.bus.subscribe(
            WorldEventKind::MoveSolidEntity,
            Box::new(|event, ctx| {
                if let WorldEvent::MoveSolidEntity {
                    entity,
                    force_x,
                    force_y,
                    force_z,
                } = event
                {
                    if let Some(physics) = ctx.registry.physics_mut(*entity) {
                        physics.force_x += force_x;
                        physics.force_y += force_y;
                        physics.force_z += force_z;
                    } else {
                        warn!(entity = entity.0, "move event for entity without physics stats");
                    }
                }
            }),
        );

        Ok(Self {
            config,
            shared,
            stats: Arc::new(MemoryStatsStore::new()),
            subsystems: SubsystemSet::default(),
            scripted: Vec::new(),
            pending_deletions: Vec::new(),
            slots: [
                BackgroundSlot::new("physics"),
                BackgroundSlot::new("ecosystem"),
                BackgroundSlot::new("metabolism"),
            ],
            runtime,
        })
    }

    /// Replaces the engine set. Takes effect from the next tick.
    pub fn set_subsystems(&mut self, subsystems: SubsystemSet) {
        self.subsystems = subsystems;
    }

    /// Replaces the statistics backend.
    pub fn set_stats_store(&mut self, stats: Arc<dyn StatsStore>) {
        self.stats = stats;
    }

    /// Appends a scripted system. Scripted systems run in registration
    /// order at the end of each tick.
    pub fn add_scripted_system(&mut self, system: Box<dyn ScriptedSystem>) {
        self.scripted.push(system);
    }

    /// The world configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The shared voxel grid.
    #[must_use]
    pub fn grid(&self) -> &VoxelGrid {
        &self.shared.grid
    }

    /// The simulation clock.
    #[must_use]
    pub fn clock(&self) -> &GameClock {
        &self.shared.clock
    }

    /// The event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    /// The statistics backend.
    #[must_use]
    pub fn stats(&self) -> &dyn StatsStore {
        self.stats.as_ref()
    }

    /// Takes the tick mutex.
    pub fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.shared.registry.lock()
    }

    /// Takes the lifecycle lock shared. Readers hold this while they
    /// build views so no deletion can run under them.
    pub fn lifecycle_shared(&self) -> RwLockReadGuard<'_, ()> {
        self.shared.lifecycle.read()
    }

    /// Takes the lifecycle lock exclusive. Held while entities are
    /// created or destroyed.
    pub fn lifecycle_exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.shared.lifecycle.write()
    }

    /// Whether any background pass is still outstanding.
    #[must_use]
    pub fn any_background_running(&self) -> bool {
        self.slots.iter().any(BackgroundSlot::is_running)
    }

    /// Advances the simulation one tick and returns the new tick count.
    ///
    /// Engine failures are logged and do not abort the tick.
    pub fn update(&mut self) -> u64 {
        let shared = Arc::clone(&self.shared);
        let tick = shared.clock.tick();
        {
            let mut registry = shared.registry.lock();
            Self::run_sync(self.subsystems.health.as_ref(), &shared, &mut registry);

            let mut deletions = std::mem::take(&mut self.pending_deletions);
            {
                let mut ctx = FlushCtx {
                    registry: &mut registry,
                    grid: &shared.grid,
                    clock: &shared.clock,
                    deletions: &mut deletions,
                };
                let delivered = shared.bus.flush(&mut ctx);
                if delivered > 0 {
                    debug!(tick, delivered, "event flush");
                }
            }
            self.pending_deletions = deletions;

            Self::run_sync(self.subsystems.physics.as_ref(), &shared, &mut registry);
            if !self.config.metabolism_background {
                Self::run_sync(self.subsystems.metabolism.as_ref(), &shared, &mut registry);
            }
            Self::run_sync(self.subsystems.ecosystem.as_ref(), &shared, &mut registry);
            Self::run_sync(self.subsystems.effects.as_ref(), &shared, &mut registry);

            for system in &mut self.scripted {
                system.update(&mut registry, &shared.grid, &shared.bus, &shared.clock);
            }
        }

        self.run_deferred_deletions();
        self.relaunch_background();
        tick
    }

    fn run_sync(system: &dyn Subsystem, shared: &Shared, registry: &mut Registry) {
        if let Err(e) = system.process(registry, &shared.grid, &shared.bus, &shared.clock) {
            error!(system = system.name(), error = %e, "synchronous pass failed");
        }
    }

    /// Destroys queued entities once no background pass can observe them.
    fn run_deferred_deletions(&mut self) {
        if self.pending_deletions.is_empty() || self.any_background_running() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let _lifecycle = shared.lifecycle.write();
        let mut registry = shared.registry.lock();
        for (id, soft) in self.pending_deletions.drain(..) {
            if id.is_special() {
                warn!(entity = id.0, "skipping deletion of reserved id");
                continue;
            }
            if !registry.contains(id) {
                warn!(entity = id.0, "skipping deletion of stale id");
                continue;
            }
            if !soft {
                Self::clear_grid_occupancy(&shared, &registry, id);
            }
            if let Err(e) = registry.destroy(id) {
                error!(entity = id.0, error = %e, "deferred destroy failed");
            }
        }
    }

    fn clear_grid_occupancy(shared: &Shared, registry: &Registry, id: EntityId) {
        let Some(pos) = registry.position(id).copied() else {
            return;
        };
        let coord = VoxelCoord::from(pos);
        let main = registry.entity_type(id).map_or(entity_type::BEAST, |t| t.main_type);
        if main == entity_type::TERRAIN {
            let _ = shared.grid.delete_terrain(coord, &shared.bus);
        } else {
            let occupant = shared.grid.entity_at(coord);
            if occupant == id {
                let _ = shared.grid.clear_entity(coord);
            } else {
                error!(
                    entity = id.0,
                    x = coord.x,
                    y = coord.y,
                    z = coord.z,
                    found = occupant.0,
                    "grid desync while clearing occupancy"
                );
            }
        }
    }

    /// Harvests finished background passes and launches new ones.
    fn relaunch_background(&mut self) {
        let specs: [(usize, Arc<dyn Subsystem>, bool); 3] = [
            (SLOT_PHYSICS, Arc::clone(&self.subsystems.physics), true),
            (SLOT_ECOSYSTEM, Arc::clone(&self.subsystems.ecosystem), true),
            (
                SLOT_METABOLISM,
                Arc::clone(&self.subsystems.metabolism),
                self.config.metabolism_background,
            ),
        ];
        for (index, system, enabled) in specs {
            if !enabled {
                continue;
            }
            let slot = &mut self.slots[index];
            if slot.is_running() {
                continue;
            }
            if let Some(handle) = slot.handle.take() {
                match self.runtime.block_on(handle) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(system = slot.name, error = %e, "background pass failed"),
                    Err(join_err) => {
                        error!(system = slot.name, error = %join_err, "background pass panicked");
                    }
                }
            }
            let shared = Arc::clone(&self.shared);
            self.slots[index].handle = Some(self.runtime.spawn_blocking(move || {
                let ctx = BackgroundCtx {
                    registry: &shared.registry,
                    grid: &shared.grid,
                    bus: &shared.bus,
                    clock: &shared.clock,
                };
                system.process_background(&ctx)
            }));
        }
    }

    /// Creates an entity from a template and registers its grid
    /// occupancy when it carries a position.
    ///
    /// # Errors
    ///
    /// Fails if the position lies outside the grid or the target voxel
    /// is already occupied; the registry is rolled back in that case.
    pub fn create_entity(&self, template: &EntityInterface) -> Result<EntityId, WorldError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.write();
        let mut registry = shared.registry.lock();
        let id = registry.create_from(template);
        if let Some(pos) = registry.position(id).copied() {
            let coord = VoxelCoord::from(pos);
            let main = registry.entity_type(id).map_or(entity_type::BEAST, |t| t.main_type);
            let placed = if main == entity_type::TERRAIN {
                let kind = registry.entity_type(id).copied().unwrap_or_default();
                let matter = registry.matter(id).copied().unwrap_or_default();
                shared.grid.set_terrain(coord, TerrainVoxel { id, kind, matter })
            } else {
                shared.grid.set_entity(coord, id)
            };
            if let Err(e) = placed {
                let _ = registry.destroy(id);
                return Err(WorldError::Grid(e));
            }
        }
        Ok(id)
    }

    /// Removes an entity immediately, clearing its grid occupancy.
    ///
    /// Prefer [`World::queue_entity_deletion`] from inside a tick;
    /// this entry point is for host-driven teardown between ticks.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::StaleEntity`] for ids the registry does
    /// not hold.
    pub fn remove_entity(&self, id: EntityId) -> Result<(), WorldError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.write();
        let mut registry = shared.registry.lock();
        if !registry.contains(id) {
            return Err(WorldError::StaleEntity(id.0));
        }
        Self::clear_grid_occupancy(shared, &registry, id);
        registry.destroy(id)?;
        Ok(())
    }

    /// Schedules an entity for deferred deletion. Soft kills keep the
    /// grid occupancy in place.
    pub fn queue_entity_deletion(&self, id: EntityId, soft: bool) {
        self.shared.bus.enqueue(WorldEvent::KillEntity { entity: id, soft });
    }

    /// Snapshots one entity, verifying its grid occupancy first.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::StaleEntity`] for unknown ids,
    /// [`WorldError::MissingComponent`] when the entity has no position,
    /// and [`WorldError::GridDesync`] when the entity layer disagrees
    /// with the registry.
    pub fn entity_by_id(&self, id: EntityId) -> Result<EntityInterface, WorldError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.read();
        let registry = shared.registry.lock();
        if !registry.contains(id) {
            return Err(WorldError::StaleEntity(id.0));
        }
        let pos = registry
            .position(id)
            .copied()
            .ok_or(WorldError::MissingComponent {
                entity: id.0,
                kind: ComponentKind::Position,
            })?;
        let main = registry.entity_type(id).map_or(entity_type::BEAST, |t| t.main_type);
        let coord = VoxelCoord::from(pos);
        if main != entity_type::TERRAIN {
            let occupant = shared.grid.entity_at(coord);
            if occupant != id {
                return Err(WorldError::GridDesync {
                    entity: id.0,
                    x: coord.x,
                    y: coord.y,
                    z: coord.z,
                    found: occupant.0,
                });
            }
        }
        registry.interface_of(id).ok_or(WorldError::StaleEntity(id.0))
    }

    /// Snapshots every entity of the given main and first sub type.
    #[must_use]
    pub fn entities_by_type(
        &self,
        main_type: i32,
        sub_type: i32,
    ) -> std::collections::BTreeMap<EntityId, EntityInterface> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.read();
        let registry = shared.registry.lock();
        let mut out = std::collections::BTreeMap::new();
        for (id, component) in registry.iter_kind(ComponentKind::EntityType) {
            if let Component::EntityType(t) = component {
                if t.main_type == main_type && t.sub_type0 == sub_type {
                    if let Some(interface) = registry.interface_of(id) {
                        out.insert(id, interface);
                    }
                }
            }
        }
        out
    }

    /// Ids of every perceiving entity of the given main and first sub
    /// type. Entities without a perception component are skipped.
    #[must_use]
    pub fn entity_ids_by_type(&self, main_type: i32, sub_type: i32) -> Vec<EntityId> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.read();
        let registry = shared.registry.lock();
        let mut out = Vec::new();
        for (id, component) in registry.iter_kind(ComponentKind::EntityType) {
            if let Component::EntityType(t) = component {
                if t.main_type == main_type
                    && t.sub_type0 == sub_type
                    && registry.perception(id).is_some()
                {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Requests a push along one or more cardinal directions for a
    /// known entity. The force is applied at the next event flush.
    ///
    /// # Errors
    ///
    /// Requires the entity to exist, carry position and physics
    /// components, and match its grid occupancy.
    pub fn dispatch_move_solid_entity_by_id(
        &self,
        id: EntityId,
        directions: &[i32],
    ) -> Result<(), WorldError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.read();
        let registry = shared.registry.lock();
        if !registry.contains(id) {
            return Err(WorldError::StaleEntity(id.0));
        }
        let pos = registry
            .position(id)
            .copied()
            .ok_or(WorldError::MissingComponent {
                entity: id.0,
                kind: ComponentKind::Position,
            })?;
        if registry.physics(id).is_none() {
            return Err(WorldError::MissingComponent {
                entity: id.0,
                kind: ComponentKind::Physics,
            });
        }
        let coord = VoxelCoord::from(pos);
        let occupant = shared.grid.entity_at(coord);
        if occupant != id {
            return Err(WorldError::GridDesync {
                entity: id.0,
                x: coord.x,
                y: coord.y,
                z: coord.z,
                found: occupant.0,
            });
        }
        let mut force = (0.0_f32, 0.0_f32, 0.0_f32);
        for &dir in directions {
            match direction::unit(dir) {
                Some((dx, dy, dz)) => {
                    force.0 += dx;
                    force.1 += dy;
                    force.2 += dz;
                }
                None => warn!(direction = dir, "ignoring unknown direction code"),
            }
        }
        shared.bus.enqueue(WorldEvent::MoveSolidEntity {
            entity: id,
            force_x: force.0,
            force_y: force.1,
            force_z: force.2,
        });
        Ok(())
    }

    /// Requests a push for whatever entity occupies a voxel.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyVoxel`] when the voxel is vacant and
    /// [`WorldError::UnsupportedLayer`] for the terrain layer, which
    /// never moves.
    pub fn dispatch_move_solid_entity_by_position(
        &self,
        x: i32,
        y: i32,
        z: i32,
        layer: GridLayer,
        force_x: f32,
        force_y: f32,
        force_z: f32,
    ) -> Result<(), WorldError> {
        match layer {
            GridLayer::Terrain => {
                warn!(x, y, z, "move requested on the terrain layer");
                Err(WorldError::UnsupportedLayer)
            }
            GridLayer::Entity => {
                let coord = VoxelCoord::new(x, y, z);
                let occupant = self.shared.grid.entity_at(coord);
                if occupant == EntityId::EMPTY {
                    return Err(WorldError::EmptyVoxel { x, y, z });
                }
                self.shared.bus.enqueue(WorldEvent::MoveSolidEntity {
                    entity: occupant,
                    force_x,
                    force_y,
                    force_z,
                });
                Ok(())
            }
        }
    }

    /// Requests an item pickup, resolved at the next event flush.
    ///
    /// # Errors
    ///
    /// Requires the acting entity to exist and carry an inventory.
    pub fn dispatch_take_item_by_id(
        &self,
        id: EntityId,
        hovered: EntityId,
        selected: EntityId,
    ) -> Result<(), WorldError> {
        self.require_inventory(id)?;
        self.shared.bus.enqueue(WorldEvent::TakeItem {
            entity: id,
            hovered,
            selected,
        });
        Ok(())
    }

    /// Requests an item use, resolved at the next event flush.
    ///
    /// # Errors
    ///
    /// Requires the acting entity to exist and carry an inventory.
    pub fn dispatch_use_item_by_id(
        &self,
        id: EntityId,
        slot: i32,
        hovered: EntityId,
        selected: EntityId,
    ) -> Result<(), WorldError> {
        self.require_inventory(id)?;
        self.shared.bus.enqueue(WorldEvent::UseItem {
            entity: id,
            slot,
            hovered,
            selected,
        });
        Ok(())
    }

    fn require_inventory(&self, id: EntityId) -> Result<(), WorldError> {
        let _lifecycle = self.shared.lifecycle.read();
        let registry = self.shared.registry.lock();
        if !registry.contains(id) {
            return Err(WorldError::StaleEntity(id.0));
        }
        if registry.inventory(id).is_none() {
            return Err(WorldError::MissingComponent {
                entity: id.0,
                kind: ComponentKind::Inventory,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("subsystems", &self.subsystems)
            .field("scripted", &self.scripted.len())
            .field("pending_deletions", &self.pending_deletions.len())
            .finish_non_exhaustive()
    }
}
