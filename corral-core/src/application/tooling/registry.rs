use super::error::ToolInvokeError;
use super::interface::{ToolExecutor, ToolSchemaSource};
use super::schema::{SchemaOverlay, ToolSchema, enrich_schema};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A tool schema bound to the executor that runs it.
#[derive(Clone)]
pub struct RegisteredTool {
    pub schema: ToolSchema,
    pub executor: Arc<dyn ToolExecutor>,
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Capability map from tool name to handler, resolved at registration.
///
/// Read-only once handed to an agent; names resolve case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    index: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema`; a later registration under the same name replaces
    /// the earlier one but keeps its position.
    pub fn register(&mut self, schema: ToolSchema, executor: Arc<dyn ToolExecutor>) {
        let key = schema.name.to_lowercase();
        if !self.index.contains_key(&key) {
            self.order.push(key.clone());
        } else {
            debug!(tool = %schema.name, "Replacing registered tool");
        }
        self.index.insert(key, RegisteredTool { schema, executor });
    }

    pub fn with_tool(mut self, schema: ToolSchema, executor: Arc<dyn ToolExecutor>) -> Self {
        self.register(schema, executor);
        self
    }

    /// Lists tools from `source`, enriches each schema from `overlay`, and
    /// binds them to `executor`. Returns how many tools were registered.
    pub async fn discover<S>(
        &mut self,
        source: &S,
        executor: Arc<dyn ToolExecutor>,
        overlay: &SchemaOverlay,
    ) -> Result<usize, ToolInvokeError>
    where
        S: ToolSchemaSource + ?Sized,
    {
        let schemas = source.list().await?;
        let count = schemas.len();
        for schema in schemas {
            let fallback = schema.clone();
            let schema = match enrich_schema(schema, overlay) {
                Ok(enriched) => enriched,
                Err(error) => {
                    warn!(%error, "Skipping schema enrichment");
                    fallback
                }
            };
            self.register(schema, executor.clone());
        }
        info!(count, "Registered tools from schema source");
        Ok(count)
    }

    pub fn resolve(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(&name.to_lowercase())
    }

    /// Schemas in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|key| self.index.get(key))
            .map(|tool| tool.schema.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
