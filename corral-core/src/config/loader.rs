use super::CONFIG_PATH;
use super::agent::{AgentConfig, ExtractorConfig};
use super::error::ConfigError;
use crate::agent::BudgetLimits;
use crate::constants::{
    DEFAULT_END_OF_CONVERSATION, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_TOKENS,
    DEFAULT_MAX_TOTAL_OUTPUT_TOKENS, DEFAULT_REPEAT_THRESHOLD, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_JITTER_MS, DEFAULT_RETRY_MAX_DELAY_MS,
    DEFAULT_TIMEOUT_SECS,
};
use crate::retry::RetryPolicy;
use crate::tooling::SchemaOverlay;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    pub system_prompt: Option<String>,
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub limits: RawLimits,
    #[serde(default)]
    pub repeat_guard: RawRepeatGuard,
    #[serde(default)]
    pub retry: RawRetry,
    #[serde(default)]
    pub conversation: RawConversation,
    #[serde(default)]
    pub schema_overlay: SchemaOverlay,
    #[serde(default)]
    pub extractors: Vec<RawExtractor>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawLimits {
    pub max_iterations: Option<u32>,
    pub max_total_output_tokens: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawRepeatGuard {
    pub threshold: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawRetry {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    #[serde(default)]
    pub retry_tools: bool,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConversation {
    pub history_window: Option<usize>,
    pub end_of_conversation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawExtractor {
    pub tool: Option<String>,
    pub entity_field: Option<String>,
    pub attribute: Option<String>,
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    read_config(config_path)
}

fn read_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

pub(super) fn parse_config(content: &str, origin: &Path) -> Result<AgentConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawConfig) -> Result<AgentConfig, ConfigError> {
    let max_output_tokens = positive(
        "max_output_tokens",
        parsed.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
    )?;

    let limits = BudgetLimits {
        max_iterations: positive(
            "limits.max_iterations",
            parsed.limits.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        )?,
        max_total_output_tokens: positive(
            "limits.max_total_output_tokens",
            parsed
                .limits
                .max_total_output_tokens
                .unwrap_or(DEFAULT_MAX_TOTAL_OUTPUT_TOKENS),
        )?,
        timeout: Duration::from_secs(positive(
            "limits.timeout_secs",
            parsed.limits.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        )?),
    };

    let repeat_threshold = positive(
        "repeat_guard.threshold",
        parsed
            .repeat_guard
            .threshold
            .unwrap_or(DEFAULT_REPEAT_THRESHOLD),
    )?;

    let base_delay_ms = parsed
        .retry
        .base_delay_ms
        .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);
    let max_delay_ms = parsed
        .retry
        .max_delay_ms
        .unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS);
    if base_delay_ms > max_delay_ms {
        return Err(ConfigError::invalid(
            "retry.base_delay_ms",
            format!("must not exceed retry.max_delay_ms ({max_delay_ms})"),
        ));
    }
    let retry = RetryPolicy {
        max_attempts: positive(
            "retry.max_attempts",
            parsed.retry.max_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
        )?,
        base_delay: Duration::from_millis(base_delay_ms),
        max_delay: Duration::from_millis(max_delay_ms),
        jitter: Duration::from_millis(parsed.retry.jitter_ms.unwrap_or(DEFAULT_RETRY_JITTER_MS)),
    };

    let history_window = parsed
        .conversation
        .history_window
        .map(|window| positive("conversation.history_window", window))
        .transpose()?;

    let end_of_conversation = match parsed.conversation.end_of_conversation {
        Some(marker) if marker.trim().is_empty() => {
            return Err(ConfigError::invalid(
                "conversation.end_of_conversation",
                "must not be blank",
            ));
        }
        Some(marker) => marker.trim().to_string(),
        None => DEFAULT_END_OF_CONVERSATION.to_string(),
    };

    let extractors = parsed
        .extractors
        .into_iter()
        .enumerate()
        .map(|(index, raw)| build_extractor(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AgentConfig {
        system_prompt: parsed
            .system_prompt
            .filter(|prompt| !prompt.trim().is_empty()),
        max_output_tokens,
        limits,
        repeat_threshold,
        retry,
        retry_tools: parsed.retry.retry_tools,
        history_window,
        end_of_conversation,
        schema_overlay: parsed.schema_overlay,
        extractors,
    })
}

fn build_extractor(index: usize, raw: RawExtractor) -> Result<ExtractorConfig, ConfigError> {
    let required = |value: Option<String>, name: &str| {
        value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::invalid(format!("extractors[{index}].{name}"), "is required"))
    };
    Ok(ExtractorConfig {
        tool: required(raw.tool, "tool")?,
        entity_field: required(raw.entity_field, "entity_field")?,
        attribute: required(raw.attribute, "attribute")?,
    })
}

fn positive<T>(field: &str, value: T) -> Result<T, ConfigError>
where
    T: PartialOrd + Default,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::invalid(field, "must be at least 1"))
    }
}
