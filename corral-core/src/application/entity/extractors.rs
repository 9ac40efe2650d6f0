use super::store::EntityStore;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Turns one successful tool call into entity facts.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, input: &Value, output: &str, store: &mut EntityStore);
}

impl<F> EntityExtractor for F
where
    F: Fn(&Value, &str, &mut EntityStore) + Send + Sync,
{
    fn extract(&self, input: &Value, output: &str, store: &mut EntityStore) {
        self(input, output, store)
    }
}

/// Records the tool output as `attribute` on the entity named by
/// `input[entity_field]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtractor {
    pub entity_field: String,
    pub attribute: String,
}

impl FieldExtractor {
    pub fn new(entity_field: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            entity_field: entity_field.into(),
            attribute: attribute.into(),
        }
    }
}

impl EntityExtractor for FieldExtractor {
    fn extract(&self, input: &Value, output: &str, store: &mut EntityStore) {
        let entity = match input.get(&self.entity_field) {
            Some(Value::String(text)) => text.trim().to_string(),
            Some(Value::Number(number)) => number.to_string(),
            _ => return,
        };
        let output = output.trim();
        if entity.is_empty() || output.is_empty() {
            return;
        }
        store.upsert(&entity, &self.attribute, output);
    }
}

/// Side table from tool name to extractor. Unlisted tools are no-ops.
#[derive(Clone, Default)]
pub struct EntityExtractors {
    by_tool: HashMap<String, Arc<dyn EntityExtractor>>,
}

impl EntityExtractors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E>(&mut self, tool: impl Into<String>, extractor: E)
    where
        E: EntityExtractor + 'static,
    {
        self.by_tool
            .insert(tool.into().to_lowercase(), Arc::new(extractor));
    }

    pub fn with<E>(mut self, tool: impl Into<String>, extractor: E) -> Self
    where
        E: EntityExtractor + 'static,
    {
        self.register(tool, extractor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.by_tool.is_empty()
    }

    /// Runs the extractor registered for `tool`; returns whether one existed.
    pub fn apply(&self, tool: &str, input: &Value, output: &str, store: &mut EntityStore) -> bool {
        let Some(extractor) = self.by_tool.get(&tool.to_lowercase()) else {
            return false;
        };
        debug!(tool, "Extracting entity facts from tool result");
        extractor.extract(input, output, store);
        true
    }
}

impl fmt::Debug for EntityExtractors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tools: Vec<_> = self.by_tool.keys().collect();
        tools.sort();
        f.debug_struct("EntityExtractors")
            .field("tools", &tools)
            .finish()
    }
}
