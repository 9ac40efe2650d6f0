pub mod agent;
pub mod error;
pub mod loader;

/// Default config file path, relative to the working directory.
pub const CONFIG_PATH: &str = "config/agent.toml";

pub use agent::{AgentConfig, ExtractorConfig};
pub use error::ConfigError;
