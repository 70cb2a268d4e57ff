//! # World Events
//!
//! The typed event bus. Producers enqueue from any thread; the orchestrator
//! flushes exactly once per tick, under the tick mutex. Delivery is
//! synchronous, in enqueue order, and each event is delivered once to every
//! subscriber of its kind. Events enqueued while a flush is running wait
//! for the next flush.

use std::collections::BTreeMap;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use verdant_core::{EntityId, GameClock, Registry};
use verdant_grid::{TerrainSink, TerrainVoxel, VoxelCoord, VoxelGrid};

/// The closed set of world events.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// Apply a force to a solid entity.
    MoveSolidEntity {
        /// Target entity.
        entity: EntityId,
        /// Force delta, X axis.
        force_x: f32,
        /// Force delta, Y axis.
        force_y: f32,
        /// Force delta, Z axis.
        force_z: f32,
    },
    /// An entity picks up an item.
    TakeItem {
        /// Acting entity.
        entity: EntityId,
        /// Item entity under the cursor.
        hovered: EntityId,
        /// Item entity currently selected.
        selected: EntityId,
    },
    /// An entity consumes or applies an inventory item.
    UseItem {
        /// Acting entity.
        entity: EntityId,
        /// Inventory slot index.
        slot: i32,
        /// Item entity under the cursor.
        hovered: EntityId,
        /// Item entity currently selected.
        selected: EntityId,
    },
    /// Schedule an entity for deferred deletion.
    KillEntity {
        /// Target entity.
        entity: EntityId,
        /// Soft kills keep the grid occupancy in place.
        soft: bool,
    },
    /// Terrain was removed from the grid.
    TerrainRemoved {
        /// Where it was.
        coord: VoxelCoord,
        /// Backing entity id of the removed record.
        terrain_id: EntityId,
    },
}

/// Kind tags for subscriber routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorldEventKind {
    /// [`WorldEvent::MoveSolidEntity`].
    MoveSolidEntity,
    /// [`WorldEvent::TakeItem`].
    TakeItem,
    /// [`WorldEvent::UseItem`].
    UseItem,
    /// [`WorldEvent::KillEntity`].
    KillEntity,
    /// [`WorldEvent::TerrainRemoved`].
    TerrainRemoved,
}

impl WorldEvent {
    /// The kind tag of this event.
    #[must_use]
    pub const fn kind(&self) -> WorldEventKind {
        match self {
            Self::MoveSolidEntity { .. } => WorldEventKind::MoveSolidEntity,
            Self::TakeItem { .. } => WorldEventKind::TakeItem,
            Self::UseItem { .. } => WorldEventKind::UseItem,
            Self::KillEntity { .. } => WorldEventKind::KillEntity,
            Self::TerrainRemoved { .. } => WorldEventKind::TerrainRemoved,
        }
    }
}

/// Mutable state handed to subscribers during a flush.
pub struct FlushCtx<'a> {
    /// The registry, under the tick mutex.
    pub registry: &'a mut Registry,
    /// The shared grid.
    pub grid: &'a VoxelGrid,
    /// The simulation clock.
    pub clock: &'a GameClock,
    /// Sink for deferred deletions collected this flush.
    pub deletions: &'a mut Vec<(EntityId, bool)>,
}

/// Subscriber callback for one event kind.
pub type EventHandler = Box<dyn FnMut(&WorldEvent, &mut FlushCtx<'_>) + Send>;

/// Typed event bus with one flush point.
pub struct EventBus {
    sender: Sender<WorldEvent>,
    receiver: Receiver<WorldEvent>,
    subscribers: Mutex<BTreeMap<WorldEventKind, Vec<EventHandler>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            subscribers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Enqueues an event for the next flush. Callable from any thread.
    pub fn enqueue(&self, event: WorldEvent) {
        // The receiver lives as long as the bus; send cannot fail.
        let _ = self.sender.send(event);
    }

    /// Registers a subscriber for one event kind. Subscribers of a kind
    /// run in registration order.
    pub fn subscribe(&self, kind: WorldEventKind, handler: EventHandler) {
        self.subscribers.lock().entry(kind).or_default().push(handler);
    }

    /// Events waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Delivers every event enqueued before this call, in order. Returns
    /// the number of delivered events. Events enqueued by subscribers
    /// during the flush stay queued for the next one.
    pub fn flush(&self, ctx: &mut FlushCtx<'_>) -> usize {
        let count = self.receiver.len();
        let mut subscribers = self.subscribers.lock();
        for _ in 0..count {
            let Ok(event) = self.receiver.try_recv() else {
                break;
            };
            if let Some(handlers) = subscribers.get_mut(&event.kind()) {
                for handler in handlers.iter_mut() {
                    handler(&event, ctx);
                }
            }
        }
        count
    }
}

impl TerrainSink for EventBus {
    fn terrain_removed(&self, coord: VoxelCoord, voxel: &TerrainVoxel) {
        self.enqueue(WorldEvent::TerrainRemoved {
            coord,
            terrain_id: voxel.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ctx_parts() -> (Registry, VoxelGrid, GameClock, Vec<(EntityId, bool)>) {
        (
            Registry::new(),
            VoxelGrid::new(8, 8, 8),
            GameClock::new(),
            Vec::new(),
        )
    }

    #[test]
    fn delivery_preserves_enqueue_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);
        bus.subscribe(
            WorldEventKind::KillEntity,
            Box::new(move |event, _ctx| {
                if let WorldEvent::KillEntity { entity, .. } = event {
                    seen.lock().push(entity.0);
                }
            }),
        );

        for id in [3, 1, 2] {
            bus.enqueue(WorldEvent::KillEntity {
                entity: EntityId(id),
                soft: false,
            });
        }

        let (mut reg, grid, clock, mut deletions) = ctx_parts();
        let mut ctx = FlushCtx {
            registry: &mut reg,
            grid: &grid,
            clock: &clock,
            deletions: &mut deletions,
        };
        assert_eq!(bus.flush(&mut ctx), 3);
        assert_eq!(*order.lock(), vec![3, 1, 2]);
        // Delivered exactly once.
        assert_eq!(bus.flush(&mut ctx), 0);
        assert_eq!(order.lock().len(), 3);
    }

    #[test]
    fn events_enqueued_during_flush_wait() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let bus_inner = Arc::clone(&bus);
        let calls_inner = Arc::clone(&calls);
        bus.subscribe(
            WorldEventKind::TakeItem,
            Box::new(move |_event, _ctx| {
                calls_inner.fetch_add(1, Ordering::SeqCst);
                // Re-enqueue; must not be delivered in this flush.
                bus_inner.enqueue(WorldEvent::TakeItem {
                    entity: EntityId(1),
                    hovered: EntityId::EMPTY,
                    selected: EntityId::EMPTY,
                });
            }),
        );

        bus.enqueue(WorldEvent::TakeItem {
            entity: EntityId(1),
            hovered: EntityId::EMPTY,
            selected: EntityId::EMPTY,
        });

        let (mut reg, grid, clock, mut deletions) = ctx_parts();
        let mut ctx = FlushCtx {
            registry: &mut reg,
            grid: &grid,
            clock: &clock,
            deletions: &mut deletions,
        };
        assert_eq!(bus.flush(&mut ctx), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.pending(), 1);
    }

    #[test]
    fn subscribers_only_see_their_kind() {
        let bus = EventBus::new();
        let kills = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&kills);
        bus.subscribe(
            WorldEventKind::KillEntity,
            Box::new(move |_event, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.enqueue(WorldEvent::TakeItem {
            entity: EntityId(7),
            hovered: EntityId::EMPTY,
            selected: EntityId::EMPTY,
        });
        bus.enqueue(WorldEvent::KillEntity {
            entity: EntityId(7),
            soft: true,
        });

        let (mut reg, grid, clock, mut deletions) = ctx_parts();
        let mut ctx = FlushCtx {
            registry: &mut reg,
            grid: &grid,
            clock: &clock,
            deletions: &mut deletions,
        };
        assert_eq!(bus.flush(&mut ctx), 2);
        assert_eq!(kills.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn terrain_sink_enqueues_removed_event() {
        let bus = EventBus::new();
        let grid = VoxelGrid::new(8, 8, 8);
        let coord = VoxelCoord::new(1, 1, 1);
        grid.set_terrain(
            coord,
            TerrainVoxel::anonymous(verdant_core::EntityType::default()),
        )
        .unwrap();
        grid.delete_terrain(coord, &bus);
        assert_eq!(bus.pending(), 1);
    }
}
