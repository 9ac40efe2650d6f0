use super::error::ConfigError;
use super::loader;
use crate::agent::BudgetLimits;
use crate::constants::{DEFAULT_END_OF_CONVERSATION, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_REPEAT_THRESHOLD};
use crate::entity::{EntityExtractors, FieldExtractor};
use crate::retry::RetryPolicy;
use crate::tooling::SchemaOverlay;
use std::path::Path;

/// Validated agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub system_prompt: Option<String>,
    pub max_output_tokens: u32,
    pub limits: BudgetLimits,
    pub repeat_threshold: u32,
    pub retry: RetryPolicy,
    /// Apply `retry` to tool calls as well as provider calls.
    pub retry_tools: bool,
    pub history_window: Option<usize>,
    pub end_of_conversation: String,
    pub schema_overlay: SchemaOverlay,
    pub extractors: Vec<ExtractorConfig>,
}

/// A `[[extractors]]` entry: record tool output as `attribute` on the entity
/// named by the call's `entity_field` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub tool: String,
    pub entity_field: String,
    pub attribute: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            limits: BudgetLimits::default(),
            repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
            retry: RetryPolicy::default(),
            retry_tools: false,
            history_window: None,
            end_of_conversation: DEFAULT_END_OF_CONVERSATION.to_string(),
            schema_overlay: SchemaOverlay::default(),
            extractors: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Loads from `path`, or from [`CONFIG_PATH`](super::CONFIG_PATH) when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        loader::load_config(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        loader::parse_config(content, Path::new("<inline>"))
    }

    /// Extractor side table built from the `[[extractors]]` entries.
    pub fn entity_extractors(&self) -> EntityExtractors {
        self.extractors
            .iter()
            .fold(EntityExtractors::new(), |table, entry| {
                table.with(
                    entry.tool.clone(),
                    FieldExtractor::new(entry.entity_field.clone(), entry.attribute.clone()),
                )
            })
    }
}
