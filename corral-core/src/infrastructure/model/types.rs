//! Completion types - Request, Response, and Error types

use crate::application::tooling::ToolSchema;
use crate::types::{Block, Turn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<Turn>,
    pub tools: Vec<ToolSchema>,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ToolUse,
    EndTurn,
    MaxTokens,
    #[serde(untagged)]
    Other(String),
}

impl StopReason {
    pub fn parse(value: &str) -> Self {
        match value {
            "tool_use" => StopReason::ToolUse,
            "end_turn" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            other => StopReason::Other(other.to_string()),
        }
    }

    /// Anything other than a request to run tools.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StopReason::ToolUse)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Vec<Block>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl CompletionResponse {
    pub fn new(content: Vec<Block>, stop_reason: StopReason, output_tokens: u64) -> Self {
        Self {
            content,
            stop_reason,
            usage: Usage { output_tokens },
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider failure: {message}")]
    Transient { message: String },
    #[error("provider rate limited the request")]
    RateLimited { retry_after: Option<Duration> },
    #[error("provider failure: {message}")]
    Fatal { message: String },
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Transient { .. } | ProviderError::RateLimited { .. }
        )
    }

    /// Minimum wait the provider asked for before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
