use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Tool declaration as handed to the completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema,
        }
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("tool '{tool}' has a malformed input schema: {reason}")]
    Malformed { tool: String, reason: String },
}

/// Locally defined field descriptions, keyed by tool name then field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaOverlay {
    tools: HashMap<String, BTreeMap<String, String>>,
}

impl SchemaOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe(
        mut self,
        tool: impl Into<String>,
        field: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.tools
            .entry(tool.into())
            .or_default()
            .insert(field.into(), description.into());
        self
    }

    pub fn fields(&self, tool: &str) -> Option<&BTreeMap<String, String>> {
        self.tools.get(tool)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Overlays field descriptions from `overlay` onto `schema`.
///
/// Only fields already declared under `input_schema.properties` are touched;
/// a tool without overlay entries comes back unchanged. A schema whose
/// `properties` is not an object is rejected and left for the caller to use
/// as-is.
pub fn enrich_schema(schema: ToolSchema, overlay: &SchemaOverlay) -> Result<ToolSchema, SchemaError> {
    let Some(fields) = overlay.fields(&schema.name) else {
        return Ok(schema);
    };

    let mut schema = schema;
    let tool = schema.name.clone();
    let malformed = |reason: String| SchemaError::Malformed {
        tool: tool.clone(),
        reason,
    };
    let properties = match schema.input_schema.get_mut("properties") {
        None => return Ok(schema),
        Some(Value::Object(properties)) => properties,
        Some(_) => return Err(malformed("'properties' is not an object".to_string())),
    };

    for (field, description) in fields {
        match properties.get_mut(field) {
            Some(Value::Object(property)) => {
                property.insert("description".to_string(), Value::String(description.clone()));
            }
            Some(_) => return Err(malformed(format!("property '{field}' is not an object"))),
            None => {}
        }
    }

    Ok(schema)
}
