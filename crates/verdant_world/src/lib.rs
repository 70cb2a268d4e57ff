//! # VERDANT World
//!
//! The tick orchestrator: owns the registry, the grid, the clock, and
//! the event bus, and drives the per-tick state machine.
//!
//! ## Tick Order
//!
//! ```text
//! clock
//!   └─ under tick mutex:
//!        health -> flush events -> physics -> [metabolism] -> ecosystem -> effects
//!   └─ scripted systems
//!   └─ deferred deletion (only when no background pass is outstanding)
//!   └─ harvest + relaunch background passes
//! ```
//!
//! ## Locks
//!
//! - The **tick mutex** serializes every registry mutation.
//! - The **lifecycle lock** is a reader/writer lock: perception readers take
//!   it shared, entity creation and destruction take it exclusive.
//! - The grid's entity layer lock is independent of both; see
//!   [`verdant_grid`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod events;
pub mod stats;
pub mod subsystem;
pub mod world;

pub use config::WorldConfig;
pub use error::{SubsystemError, WorldError};
pub use events::{EventBus, FlushCtx, WorldEvent, WorldEventKind};
pub use stats::{MemoryStatsStore, StatsStore};
pub use subsystem::{BackgroundCtx, NoopSubsystem, Subsystem, SubsystemSet};
pub use world::{ScriptedSystem, World};
