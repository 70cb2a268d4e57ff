//! # World Configuration
//!
//! Explicit construction-time parameters for the orchestrator. Loaded once
//! at startup from TOML; nothing here changes at runtime.

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Construction-time world parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grid extent along X.
    pub width: i32,
    /// Grid extent along Y.
    pub height: i32,
    /// Grid extent along Z.
    pub depth: i32,
    /// Run the metabolism pass on a background worker instead of inside
    /// the synchronous tick.
    pub metabolism_background: bool,
    /// Number of worker batches a perception batch request is split into.
    pub perception_batches: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            depth: 64,
            metabolism_background: false,
            perception_batches: 16,
        }
    }
}

impl WorldConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, WorldError> {
        toml::from_str(text).map_err(|e| WorldError::Config(e.to_string()))
    }
}
