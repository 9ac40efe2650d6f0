use super::error::ToolInvokeError;
use super::guard::{RepeatGuard, RepeatVerdict, ToolCallKey};
use super::interface::ToolOutput;
use super::registry::ToolRegistry;
use crate::conversation::ConversationStore;
use crate::entity::{EntityExtractors, EntityStore};
use crate::retry::{RetryError, RetryPolicy, with_retry};
use crate::types::Block;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Record of one executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStep {
    pub id: String,
    pub tool: String,
    pub input: Value,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug)]
pub(crate) enum DispatchOutcome {
    Executed(ToolStep),
    RepeatDetected { key: ToolCallKey, count: u32 },
    Cancelled,
}

/// Session-scoped dispatcher: owns the repeat guard, borrows the shared
/// registry and extractor table.
pub(crate) struct ToolDispatcher<'a> {
    registry: &'a ToolRegistry,
    extractors: &'a EntityExtractors,
    retry: &'a RetryPolicy,
    guard: RepeatGuard,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(
        registry: &'a ToolRegistry,
        extractors: &'a EntityExtractors,
        retry: &'a RetryPolicy,
        repeat_threshold: u32,
    ) -> Self {
        Self {
            registry,
            extractors,
            retry,
            guard: RepeatGuard::new(repeat_threshold),
        }
    }

    /// Checks the repeat guard, runs the tool, and on completion appends the
    /// `[preamble.., tool_use]` assistant turn followed by its `tool_result`.
    ///
    /// Nothing is appended and `preamble` is left untouched when the guard
    /// trips or the call is cancelled.
    pub async fn dispatch(
        &mut self,
        call: ToolCall,
        preamble: &mut Vec<Block>,
        conversation: &mut ConversationStore,
        entities: &mut EntityStore,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let key = ToolCallKey::new(&call.name, &call.input);
        if let RepeatVerdict::Tripped { count } = self.guard.record(&key) {
            return DispatchOutcome::RepeatDetected { key, count };
        }

        debug!(tool = %call.name, id = %call.id, "Dispatching tool call");
        let (content, success) = match self.invoke(&call, cancel).await {
            Ok(output) => (output.to_content(), true),
            Err(RetryError::Cancelled) => {
                warn!(tool = %call.name, "Tool call cancelled");
                return DispatchOutcome::Cancelled;
            }
            Err(RetryError::Exhausted { attempts, last }) if attempts > 1 => {
                (format!("Error: {last} (after {attempts} attempts)"), false)
            }
            Err(RetryError::Exhausted { last: error, .. } | RetryError::Fatal(error)) => {
                (format!("Error: {error}"), false)
            }
        };
        info!(tool = %call.name, success, "Tool executed");

        if success {
            self.extractors
                .apply(&call.name, &call.input, &content, entities);
        } else {
            warn!(tool = %call.name, error = %content, "Recording tool failure as tool_result");
        }

        let mut blocks = std::mem::take(preamble);
        blocks.push(Block::tool_use(
            call.id.clone(),
            call.name.clone(),
            call.input.clone(),
        ));
        conversation.append_assistant(blocks);
        if success {
            conversation.append_tool_result(call.id.clone(), content.clone());
        } else {
            conversation.append_tool_error(call.id.clone(), content.clone());
        }

        DispatchOutcome::Executed(ToolStep {
            id: call.id,
            tool: call.name,
            input: call.input,
            success,
            output: content,
        })
    }

    async fn invoke(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, RetryError<ToolInvokeError>> {
        let Some(tool) = self.registry.resolve(&call.name) else {
            warn!(requested_tool = %call.name, "Unknown tool requested by model");
            return Err(RetryError::Fatal(ToolInvokeError::UnknownTool {
                tool: call.name.clone(),
            }));
        };

        let arguments = match &call.input {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        let executor = tool.executor.clone();
        let name = tool.schema.name.clone();

        with_retry(self.retry, cancel, "tool_call", || {
            let executor = executor.clone();
            let name = name.clone();
            let arguments = arguments.clone();
            async move { executor.call(&name, arguments).await }
        })
        .await
    }
}
