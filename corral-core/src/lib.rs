//! # corral
//!
//! A bounded agent loop that mediates between a user, a completion provider
//! and a set of externally hosted tools.
//!
//! Each iteration:
//! 1. Assemble the conversation (plus any remembered entity facts)
//! 2. Call the completion provider through the retry layer
//! 3. Dispatch requested tools, recording `tool_use`/`tool_result` pairs
//! 4. Consult the safety governor and either loop, wait for the user, or stop
//!
//! Every run ends with an explicit [`agent::TerminationReason`] and a snapshot
//! of the conversation and entity stores.

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

pub use application::{agent, conversation, entity, retry, tooling};
pub use config::{AgentConfig, ConfigError};
pub use domain::types;
pub use infrastructure::model;
