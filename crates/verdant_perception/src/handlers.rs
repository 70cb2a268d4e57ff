//! The query command handler table.
//!
//! Handlers are validated before execution and write their results onto
//! fixed channels. Dispatch isolates commands from each other: an
//! unknown name, a failed validation, or a failed execution is logged
//! and the remaining commands still run.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::{debug, warn};
use verdant_core::{Component, ComponentKind, EntityId, Registry};
use verdant_world::{EventBus, StatsStore, WorldEvent};

use crate::command::{channels, commands, params, series, QueryCommand};
use crate::error::PerceptionError;
use crate::response::QueryResponse;

/// Read-only world access handed to executing handlers.
pub struct QueryContext<'a> {
    /// The registry, already held under the tick mutex.
    pub registry: &'a Registry,
    /// The statistics backend.
    pub stats: &'a dyn StatsStore,
    /// The event bus, for commands with side effects.
    pub bus: &'a EventBus,
    /// The observer the surrounding request belongs to.
    pub observer: EntityId,
}

/// One named command implementation.
pub trait CommandHandler: Send + Sync {
    /// Cheap structural check, run before execution.
    ///
    /// # Errors
    ///
    /// Parameter errors; a command that fails validation never executes.
    fn validate(&self, command: &QueryCommand) -> Result<(), PerceptionError>;

    /// Runs the command, writing any result onto its channel.
    ///
    /// # Errors
    ///
    /// Execution failures; siblings in the same request still run.
    fn execute(
        &self,
        command: &QueryCommand,
        ctx: &QueryContext<'_>,
        out: &mut BTreeMap<i32, QueryResponse>,
    ) -> Result<(), PerceptionError>;
}

/// Per-entity data dump on channel [`channels::ENTITY_DATA`].
struct EntityDataHandler;

impl CommandHandler for EntityDataHandler {
    fn validate(&self, command: &QueryCommand) -> Result<(), PerceptionError> {
        command
            .require_i32(commands::QUERY_ENTITIES_DATA, params::ENTITY_TYPE_ID)
            .map(|_| ())
    }

    fn execute(
        &self,
        command: &QueryCommand,
        ctx: &QueryContext<'_>,
        out: &mut BTreeMap<i32, QueryResponse>,
    ) -> Result<(), PerceptionError> {
        let type_id = command.require_i32(commands::QUERY_ENTITIES_DATA, params::ENTITY_TYPE_ID)?;
        let mut entities = BTreeMap::new();
        for (id, component) in ctx.registry.iter_kind(ComponentKind::EntityType) {
            let Component::EntityType(t) = component else {
                continue;
            };
            if t.main_type != type_id {
                continue;
            }
            let mut row = BTreeMap::new();
            row.insert("ID".to_owned(), id.0.to_string());
            row.insert("Type".to_owned(), format!("{}:{}", t.main_type, t.sub_type0));
            if let Some(health) = ctx.registry.health(id) {
                row.insert("Health".to_owned(), health.health_level.to_string());
            }
            entities.insert(id.0.to_string(), row);
        }
        out.insert(channels::ENTITY_DATA, QueryResponse::MapOfMaps(entities));
        Ok(())
    }
}

/// Statistics dump for one engine's series list.
struct StatisticsHandler {
    command: &'static str,
    channel: i32,
    series: &'static [&'static str],
}

impl CommandHandler for StatisticsHandler {
    fn validate(&self, command: &QueryCommand) -> Result<(), PerceptionError> {
        command.optional_u64(self.command, params::START)?;
        command.optional_u64(self.command, params::END)?;
        Ok(())
    }

    fn execute(
        &self,
        command: &QueryCommand,
        ctx: &QueryContext<'_>,
        out: &mut BTreeMap<i32, QueryResponse>,
    ) -> Result<(), PerceptionError> {
        let start = command.optional_u64(self.command, params::START)?;
        let end = command.optional_u64(self.command, params::END)?;
        let mut report = BTreeMap::new();
        for name in self.series {
            let samples: BTreeMap<String, f64> = ctx
                .stats
                .query(name, start, end)
                .into_iter()
                .map(|(ts, value)| (ts.to_string(), value))
                .collect();
            report.insert((*name).to_owned(), samples);
        }
        out.insert(self.channel, QueryResponse::MapOfMapsDouble(report));
        Ok(())
    }
}

/// Pushes the observer along the XY plane. Produces no response; the
/// force lands at the next event flush.
struct MoveHandler;

impl CommandHandler for MoveHandler {
    fn validate(&self, command: &QueryCommand) -> Result<(), PerceptionError> {
        command.optional_i32(commands::MOVE, params::X)?;
        command.optional_i32(commands::MOVE, params::Y)?;
        Ok(())
    }

    fn execute(
        &self,
        command: &QueryCommand,
        ctx: &QueryContext<'_>,
        _out: &mut BTreeMap<i32, QueryResponse>,
    ) -> Result<(), PerceptionError> {
        let x = command.optional_i32(commands::MOVE, params::X)?.unwrap_or(0);
        let y = command.optional_i32(commands::MOVE, params::Y)?.unwrap_or(0);
        ctx.bus.enqueue(WorldEvent::MoveSolidEntity {
            entity: ctx.observer,
            force_x: x as f32,
            force_y: y as f32,
            force_z: 0.0,
        });
        debug!(observer = ctx.observer.0, x, y, "move command queued");
        Ok(())
    }
}

/// String-keyed table of command handlers.
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// The full production command set.
    #[must_use]
    pub fn standard() -> Self {
        let mut handlers: BTreeMap<&'static str, Box<dyn CommandHandler>> = BTreeMap::new();
        handlers.insert(commands::QUERY_ENTITIES_DATA, Box::new(EntityDataHandler));
        handlers.insert(
            commands::GET_AI_STATISTICS,
            Box::new(StatisticsHandler {
                command: commands::GET_AI_STATISTICS,
                channel: channels::AI_STATISTICS,
                series: series::AI,
            }),
        );
        handlers.insert(
            commands::GET_PHYSICS_STATISTICS,
            Box::new(StatisticsHandler {
                command: commands::GET_PHYSICS_STATISTICS,
                channel: channels::PHYSICS_STATISTICS,
                series: series::PHYSICS,
            }),
        );
        handlers.insert(
            commands::GET_LIFE_STATISTICS,
            Box::new(StatisticsHandler {
                command: commands::GET_LIFE_STATISTICS,
                channel: channels::LIFE_STATISTICS,
                series: series::LIFE,
            }),
        );
        handlers.insert(commands::MOVE, Box::new(MoveHandler));
        Self { handlers }
    }

    /// Known command names, in table order.
    pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Runs every command in `commands`, isolating failures: a failing
    /// command is logged and skipped while the rest still run.
    #[must_use]
    pub fn dispatch(
        &self,
        requests: &[QueryCommand],
        ctx: &QueryContext<'_>,
    ) -> BTreeMap<i32, QueryResponse> {
        let mut out = BTreeMap::new();
        for request in requests {
            let Some(handler) = self.handlers.get(request.kind.as_str()) else {
                warn!(command = %request.kind, "unknown query command skipped");
                continue;
            };
            if let Err(e) = handler.validate(request) {
                warn!(command = %request.kind, error = %e, "query command failed validation");
                continue;
            }
            if let Err(e) = handler.execute(request, ctx, &mut out) {
                warn!(command = %request.kind, error = %e, "query command failed");
            }
        }
        out
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The process-wide handler table.
pub fn standard_registry() -> &'static CommandRegistry {
    static REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();
    REGISTRY.get_or_init(CommandRegistry::standard)
}
