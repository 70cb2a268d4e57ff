//! # Subsystem Contract
//!
//! Engines (physics, ecosystem, metabolism, health, effects) are external
//! collaborators behind this trait. A synchronous pass receives the
//! registry under the tick mutex; a background pass receives the lock
//! handles instead and takes the tick mutex only for its short critical
//! sections, so it can overlap the next tick. Passes never need the
//! lifecycle lock, and they report entity deaths by enqueuing kill events
//! rather than destroying anything themselves.

use std::sync::Arc;

use parking_lot::Mutex;
use verdant_core::{GameClock, Registry};
use verdant_grid::VoxelGrid;

use crate::error::SubsystemError;
use crate::events::EventBus;

/// Handles available to a background pass.
pub struct BackgroundCtx<'a> {
    /// The tick mutex over the registry. Lock briefly.
    pub registry: &'a Mutex<Registry>,
    /// The shared grid.
    pub grid: &'a VoxelGrid,
    /// The event bus.
    pub bus: &'a EventBus,
    /// The simulation clock.
    pub clock: &'a GameClock,
}

/// One engine slot in the tick machine.
pub trait Subsystem: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    /// Synchronous pass, run under the tick mutex.
    fn process(
        &self,
        registry: &mut Registry,
        grid: &VoxelGrid,
        bus: &EventBus,
        clock: &GameClock,
    ) -> Result<(), SubsystemError>;

    /// Background pass, run on a worker between ticks. The default takes
    /// the tick mutex once and runs the synchronous pass.
    fn process_background(&self, ctx: &BackgroundCtx<'_>) -> Result<(), SubsystemError> {
        let mut registry = ctx.registry.lock();
        self.process(&mut registry, ctx.grid, ctx.bus, ctx.clock)
    }
}

/// Subsystem that does nothing. Default filler for unwired slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSubsystem;

impl Subsystem for NoopSubsystem {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn process(
        &self,
        _registry: &mut Registry,
        _grid: &VoxelGrid,
        _bus: &EventBus,
        _clock: &GameClock,
    ) -> Result<(), SubsystemError> {
        Ok(())
    }
}

/// The five engine slots the tick machine drives.
#[derive(Clone)]
pub struct SubsystemSet {
    /// Runs first each tick, before the event flush.
    pub health: Arc<dyn Subsystem>,
    /// Runs after the flush; also relaunched as a background pass.
    pub physics: Arc<dyn Subsystem>,
    /// Synchronous or background depending on configuration.
    pub metabolism: Arc<dyn Subsystem>,
    /// Runs after physics; also relaunched as a background pass.
    pub ecosystem: Arc<dyn Subsystem>,
    /// Runs last inside the tick mutex.
    pub effects: Arc<dyn Subsystem>,
}

impl Default for SubsystemSet {
    fn default() -> Self {
        Self {
            health: Arc::new(NoopSubsystem),
            physics: Arc::new(NoopSubsystem),
            metabolism: Arc::new(NoopSubsystem),
            ecosystem: Arc::new(NoopSubsystem),
            effects: Arc::new(NoopSubsystem),
        }
    }
}

impl std::fmt::Debug for SubsystemSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemSet")
            .field("health", &self.health.name())
            .field("physics", &self.physics.name())
            .field("metabolism", &self.metabolism.name())
            .field("ecosystem", &self.ecosystem.name())
            .field("effects", &self.effects.name())
            .finish()
    }
}
