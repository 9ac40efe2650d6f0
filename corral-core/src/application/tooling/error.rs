use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("tool '{tool}' is not registered")]
    UnknownTool { tool: String },
    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
    #[error("tool host transport error: {message}")]
    Transport { message: String },
    #[error("tool '{tool}' timed out")]
    Timeout { tool: String },
}

impl ToolInvokeError {
    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Failures worth another attempt when tool retries are enabled.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ToolInvokeError::Transport { .. } | ToolInvokeError::Timeout { .. }
        )
    }
}
