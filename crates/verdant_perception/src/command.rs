//! Query commands and the fixed name tables.
//!
//! Command names, parameter names, channel ids, and statistics series
//! names are part of the client protocol and must not drift.

use std::collections::BTreeMap;

use crate::error::PerceptionError;

/// Command names accepted by the handler table.
pub mod commands {
    /// Per-entity data dump for one entity type.
    pub const QUERY_ENTITIES_DATA: &str = "query_entities_data";
    /// AI engine statistics series.
    pub const GET_AI_STATISTICS: &str = "get_ai_statistics";
    /// Physics engine statistics series.
    pub const GET_PHYSICS_STATISTICS: &str = "get_physics_statistics";
    /// Life engine statistics series.
    pub const GET_LIFE_STATISTICS: &str = "get_life_statistics";
    /// Push the observer along the XY plane.
    pub const MOVE: &str = "move";
}

/// Parameter names.
pub mod params {
    /// Main entity type for [`super::commands::QUERY_ENTITIES_DATA`].
    pub const ENTITY_TYPE_ID: &str = "entity_type_id";
    /// Inclusive lower timestamp bound for statistics queries.
    pub const START: &str = "start";
    /// Inclusive upper timestamp bound for statistics queries.
    pub const END: &str = "end";
    /// X force for [`super::commands::MOVE`].
    pub const X: &str = "x";
    /// Y force for [`super::commands::MOVE`].
    pub const Y: &str = "y";
}

/// Response channel ids. Each responding command writes to its fixed
/// channel; clients key on these numbers.
pub mod channels {
    /// [`super::commands::QUERY_ENTITIES_DATA`].
    pub const ENTITY_DATA: i32 = 1;
    /// [`super::commands::GET_AI_STATISTICS`].
    pub const AI_STATISTICS: i32 = 2;
    /// [`super::commands::GET_PHYSICS_STATISTICS`].
    pub const PHYSICS_STATISTICS: i32 = 3;
    /// [`super::commands::GET_LIFE_STATISTICS`].
    pub const LIFE_STATISTICS: i32 = 4;
}

/// Statistics series names, grouped per engine.
pub mod series {
    /// Series reported on [`super::channels::AI_STATISTICS`].
    pub const AI: &[&str] = &[
        "population_size",
        "inference_queue_size",
        "action_queue_size",
        "population_mean",
        "population_max",
        "population_min",
    ];

    /// Series reported on [`super::channels::PHYSICS_STATISTICS`].
    pub const PHYSICS: &[&str] = &[
        "physics_move_gas_entity",
        "physics_move_solid_entity",
        "physics_evaporate_water_entity",
        "physics_condense_water_entity",
        "physics_water_fall_entity",
        "physics_water_spread",
        "physics_water_gravity_flow",
        "physics_terrain_phase_conversion",
        "physics_vapor_creation",
        "physics_vapor_merge_up",
        "physics_vapor_merge_sideways",
        "physics_add_vapor_to_tile_above",
        "physics_create_vapor_entity",
        "physics_delete_or_convert_terrain",
        "physics_invalid_terrain_found",
    ];

    /// Series reported on [`super::channels::LIFE_STATISTICS`].
    pub const LIFE: &[&str] = &[
        "life_kill_entity",
        "life_soft_kill_entity",
        "life_hard_kill_entity",
        "life_remove_velocity",
        "life_remove_moving_component",
    ];
}

/// One string-keyed command with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryCommand {
    /// Command name, one of [`commands`].
    pub kind: String,
    /// Raw string parameters.
    pub params: BTreeMap<String, String>,
}

impl QueryCommand {
    /// Command with no parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter attachment.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Raw parameter value, if given.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Required `i32` parameter.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::MissingParam`] when absent,
    /// [`PerceptionError::InvalidParam`] when unparseable.
    pub fn require_i32(&self, command: &'static str, name: &'static str) -> Result<i32, PerceptionError> {
        let raw = self
            .param(name)
            .ok_or(PerceptionError::MissingParam { command, param: name })?;
        raw.parse().map_err(|_| PerceptionError::InvalidParam {
            command,
            param: name,
            value: raw.to_owned(),
        })
    }

    /// Optional `i32` parameter.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::InvalidParam`] when present but unparseable.
    pub fn optional_i32(&self, command: &'static str, name: &'static str) -> Result<Option<i32>, PerceptionError> {
        match self.param(name) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| PerceptionError::InvalidParam {
                command,
                param: name,
                value: raw.to_owned(),
            }),
        }
    }

    /// Optional `u64` parameter.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::InvalidParam`] when present but unparseable.
    pub fn optional_u64(&self, command: &'static str, name: &'static str) -> Result<Option<u64>, PerceptionError> {
        match self.param(name) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| PerceptionError::InvalidParam {
                command,
                param: name,
                value: raw.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_then_invalid() {
        let cmd = QueryCommand::new(commands::QUERY_ENTITIES_DATA);
        assert!(matches!(
            cmd.require_i32(commands::QUERY_ENTITIES_DATA, params::ENTITY_TYPE_ID),
            Err(PerceptionError::MissingParam { .. })
        ));
        let cmd = cmd.with_param(params::ENTITY_TYPE_ID, "beast");
        assert!(matches!(
            cmd.require_i32(commands::QUERY_ENTITIES_DATA, params::ENTITY_TYPE_ID),
            Err(PerceptionError::InvalidParam { .. })
        ));
        let cmd = cmd.with_param(params::ENTITY_TYPE_ID, "2");
        assert_eq!(
            cmd.require_i32(commands::QUERY_ENTITIES_DATA, params::ENTITY_TYPE_ID)
                .unwrap(),
            2
        );
    }

    #[test]
    fn optional_params_pass_through_absence() {
        let cmd = QueryCommand::new(commands::GET_AI_STATISTICS);
        assert_eq!(cmd.optional_u64(commands::GET_AI_STATISTICS, params::START).unwrap(), None);
        let cmd = cmd.with_param(params::START, "42");
        assert_eq!(
            cmd.optional_u64(commands::GET_AI_STATISTICS, params::START).unwrap(),
            Some(42)
        );
    }

    #[test]
    fn channel_ids_are_stable() {
        assert_eq!(channels::ENTITY_DATA, 1);
        assert_eq!(channels::AI_STATISTICS, 2);
        assert_eq!(channels::PHYSICS_STATISTICS, 3);
        assert_eq!(channels::LIFE_STATISTICS, 4);
    }
}
