//! Perception pipeline errors.

use thiserror::Error;
use verdant_core::{CodecError, ComponentKind};

/// Everything that can go wrong while building a perception response.
#[derive(Error, Debug)]
pub enum PerceptionError {
    /// The observer id is not held by the registry.
    #[error("stale observer id {0}")]
    StaleObserver(i32),

    /// The observer lacks a component the pipeline needs.
    #[error("entity {entity} missing component {kind:?}")]
    MissingComponent {
        /// Raw entity id.
        entity: i32,
        /// The absent kind.
        kind: ComponentKind,
    },

    /// A command name has no handler.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A command is missing a required parameter.
    #[error("command '{command}' missing parameter '{param}'")]
    MissingParam {
        /// Command name.
        command: &'static str,
        /// Parameter name.
        param: &'static str,
    },

    /// A command parameter failed to parse.
    #[error("command '{command}' parameter '{param}' has invalid value '{value}'")]
    InvalidParam {
        /// Command name.
        command: &'static str,
        /// Parameter name.
        param: &'static str,
        /// The rejected raw value.
        value: String,
    },

    /// Wire-level failure while decoding a response.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
