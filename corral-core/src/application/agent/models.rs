use super::governor::{BudgetKind, BudgetLimits, BudgetUsage};
use crate::config::AgentConfig;
use crate::constants::{DEFAULT_END_OF_CONVERSATION, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_REPEAT_THRESHOLD};
use crate::entity::EntityStore;
use crate::retry::RetryPolicy;
use crate::tooling::ToolStep;
use crate::types::{Role, Turn};
use std::fmt;

/// Runtime knobs for one [`Agent`](super::Agent).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    pub system_prompt: String,
    /// Cap handed to the provider on every call.
    pub max_output_tokens: u32,
    pub limits: BudgetLimits,
    pub repeat_threshold: u32,
    pub provider_retry: RetryPolicy,
    /// `None` runs each tool call once.
    pub tool_retry: Option<RetryPolicy>,
    /// Send only the newest turns to the provider when set.
    pub history_window: Option<usize>,
    pub end_of_conversation: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            limits: BudgetLimits::default(),
            repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
            provider_retry: RetryPolicy::default(),
            tool_retry: None,
            history_window: None,
            end_of_conversation: DEFAULT_END_OF_CONVERSATION.to_string(),
        }
    }
}

impl From<&AgentConfig> for AgentOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone().unwrap_or_default(),
            max_output_tokens: config.max_output_tokens,
            limits: config.limits,
            repeat_threshold: config.repeat_threshold,
            provider_retry: config.retry.clone(),
            tool_retry: config.retry_tools.then(|| config.retry.clone()),
            history_window: config.history_window,
            end_of_conversation: config.end_of_conversation.clone(),
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    NaturalCompletion,
    UserEnded,
    Cancelled,
    RepeatedCallDetected { key: String },
    BudgetExceeded(BudgetKind),
    FatalProviderError { message: String },
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::NaturalCompletion => "NATURAL_COMPLETION",
            TerminationReason::UserEnded => "USER_ENDED",
            TerminationReason::Cancelled => "CANCELLED",
            TerminationReason::RepeatedCallDetected { .. } => "REPEATED_CALL_DETECTED",
            TerminationReason::BudgetExceeded(BudgetKind::Iterations) => "ITERATIONS_EXHAUSTED",
            TerminationReason::BudgetExceeded(BudgetKind::OutputTokens) => "TOKENS_EXHAUSTED",
            TerminationReason::BudgetExceeded(BudgetKind::WallClock) => "TIMEOUT",
            TerminationReason::FatalProviderError { .. } => "FATAL_PROVIDER_ERROR",
        }
    }

    pub fn is_budget(&self) -> bool {
        matches!(self, TerminationReason::BudgetExceeded(_))
    }

    /// Natural completion or the user closing the session.
    pub fn is_graceful(&self) -> bool {
        matches!(
            self,
            TerminationReason::NaturalCompletion | TerminationReason::UserEnded
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::RepeatedCallDetected { key } => {
                write!(f, "{} ({key})", self.as_str())
            }
            TerminationReason::FatalProviderError { message } => {
                write!(f, "{}: {message}", self.as_str())
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// Final state of a session, returned for every termination reason.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: String,
    pub reason: TerminationReason,
    pub conversation: Vec<Turn>,
    pub entities: EntityStore,
    pub usage: BudgetUsage,
    pub steps: Vec<ToolStep>,
}

impl SessionOutcome {
    /// Text of the last assistant turn that carried any.
    pub fn final_response(&self) -> Option<String> {
        self.conversation
            .iter()
            .rev()
            .filter(|turn| turn.role == Role::Assistant)
            .map(Turn::text)
            .find(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Block;
    use serde_json::json;

    #[test]
    fn budget_reasons_are_distinguishable() {
        let reasons = [
            TerminationReason::BudgetExceeded(BudgetKind::Iterations),
            TerminationReason::BudgetExceeded(BudgetKind::OutputTokens),
            TerminationReason::BudgetExceeded(BudgetKind::WallClock),
            TerminationReason::NaturalCompletion,
        ];
        let names: Vec<_> = reasons.iter().map(TerminationReason::as_str).collect();
        assert_eq!(
            names,
            vec!["ITERATIONS_EXHAUSTED", "TOKENS_EXHAUSTED", "TIMEOUT", "NATURAL_COMPLETION"]
        );
        assert!(reasons[0].is_budget());
        assert!(!reasons[3].is_budget());
        assert!(reasons[3].is_graceful());
    }

    #[test]
    fn final_response_skips_tool_only_turns() {
        let outcome = SessionOutcome {
            session_id: "s".into(),
            reason: TerminationReason::NaturalCompletion,
            conversation: vec![
                Turn::user_text("hi"),
                Turn::new(Role::Assistant, vec![Block::text("Sunny in Boston.")]),
                Turn::new(
                    Role::Assistant,
                    vec![Block::tool_use("t1", "get_weather", json!({}))],
                ),
            ],
            entities: EntityStore::new(),
            usage: BudgetUsage::default(),
            steps: Vec::new(),
        };
        assert_eq!(outcome.final_response().as_deref(), Some("Sunny in Boston."));
    }
}
