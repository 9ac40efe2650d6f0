use super::error::ToolInvokeError;
use super::schema::ToolSchema;
use async_trait::async_trait;
use serde_json::Value;

/// Payload returned by a tool host.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub data: Value,
}

impl ToolOutput {
    pub fn new(data: impl Into<Value>) -> Self {
        Self { data: data.into() }
    }

    /// Strings pass through verbatim; anything else becomes compact JSON.
    pub fn to_content(&self) -> String {
        match &self.data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Executes tools hosted outside this process.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call(&self, tool: &str, arguments: Value) -> Result<ToolOutput, ToolInvokeError>;
}

/// Lists the tools a host offers.
#[async_trait]
pub trait ToolSchemaSource: Send + Sync {
    async fn list(&self) -> Result<Vec<ToolSchema>, ToolInvokeError>;
}
