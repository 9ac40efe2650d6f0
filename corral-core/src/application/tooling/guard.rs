use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Deterministic identity of a tool call: name plus key-sorted arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolCallKey(String);

impl ToolCallKey {
    pub fn new(tool: &str, input: &Value) -> Self {
        let mut key = String::with_capacity(tool.len() + 32);
        key.push_str(tool);
        key.push(':');
        write_canonical(input, &mut key);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolCallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            out.push('{');
            for (index, (key, nested)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(nested, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatVerdict {
    Allow { count: u32 },
    Tripped { count: u32 },
}

/// Per-session counter of identical tool calls.
#[derive(Debug, Clone)]
pub struct RepeatGuard {
    threshold: u32,
    counts: HashMap<ToolCallKey, u32>,
}

impl RepeatGuard {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            counts: HashMap::new(),
        }
    }

    /// Counts one more occurrence of `key`; trips once the count exceeds the
    /// threshold.
    pub fn record(&mut self, key: &ToolCallKey) -> RepeatVerdict {
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > self.threshold {
            warn!(key = %key, count = *count, threshold = self.threshold, "Repeated tool call detected");
            RepeatVerdict::Tripped { count: *count }
        } else {
            RepeatVerdict::Allow { count: *count }
        }
    }

    pub fn count(&self, key: &ToolCallKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }
}
