//! # VERDANT Perception
//!
//! Observer-relative world views. A perception request names an observer
//! entity and a list of query commands; the pipeline assembles one
//! serialized response per observer:
//!
//! ```text
//! lifecycle (shared) + tick mutex
//!   └─ clamp window to pos ± radius
//!   └─ terrain pass, descending order, with occlusion
//!   └─ entity pass over the occupancy layer
//!   └─ per-type component attachment
//!   └─ observer inventory item details
//!   └─ command dispatch through the handler table
//!   └─ one buffer out
//! ```
//!
//! The batch entry point fans jobs out over scoped worker threads; one
//! failed job never poisons its siblings.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod response;

pub use command::{channels, commands, params, series, QueryCommand};
pub use error::PerceptionError;
pub use handlers::{standard_registry, CommandHandler, CommandRegistry, QueryContext};
pub use pipeline::{create_perception_response, create_perception_responses, PerceptionJob};
pub use response::{PerceptionResponse, QueryResponse, WorldView};
