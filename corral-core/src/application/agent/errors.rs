use thiserror::Error;

/// Caller mistakes detected before a session starts.
///
/// Failures inside the loop never surface here; they end the session with a
/// [`TerminationReason`](super::TerminationReason) instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("the seed prompt is empty")]
    EmptyPrompt,
}
