use crate::constants::ENTITY_CONTEXT_HEADING;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
    pub notes: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl EntityRecord {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            attributes: BTreeMap::new(),
            notes: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    fn render(&self, out: &mut String) {
        out.push_str("- ");
        out.push_str(&self.id);
        if !self.attributes.is_empty() {
            let attributes = self
                .attributes
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            out.push_str(": ");
            out.push_str(&attributes);
        }
        out.push('\n');
        if !self.notes.is_empty() {
            out.push_str("  notes: ");
            out.push_str(&self.notes.join(" | "));
            out.push('\n');
        }
    }
}

/// Key/value fact cache keyed by entity id; last write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityStore {
    records: BTreeMap<String, EntityRecord>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, entity_id: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        debug!(entity = entity_id, key, "Upserting entity attribute");
        let record = self
            .records
            .entry(entity_id.to_string())
            .or_insert_with(|| EntityRecord::new(entity_id));
        record.attributes.insert(key.to_string(), value);
        record.last_updated = Utc::now();
    }

    pub fn add_note(&mut self, entity_id: &str, note: impl Into<String>) {
        let record = self
            .records
            .entry(entity_id.to_string())
            .or_insert_with(|| EntityRecord::new(entity_id));
        record.notes.push(note.into());
        record.last_updated = Utc::now();
    }

    pub fn get(&self, entity_id: &str) -> Option<&EntityRecord> {
        self.records.get(entity_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rendered summary of every entity, or `""` when the store is empty.
    pub fn as_prompt_context(&self) -> String {
        self.render(|_| true)
    }

    /// Like [`as_prompt_context`](Self::as_prompt_context) restricted to
    /// records accepted by `filter`.
    pub fn as_prompt_context_filtered<F>(&self, filter: F) -> String
    where
        F: Fn(&EntityRecord) -> bool,
    {
        self.render(filter)
    }

    fn render<F>(&self, filter: F) -> String
    where
        F: Fn(&EntityRecord) -> bool,
    {
        let mut body = String::new();
        for record in self.records.values().filter(|record| filter(record)) {
            record.render(&mut body);
        }
        if body.is_empty() {
            return String::new();
        }
        format!("{ENTITY_CONTEXT_HEADING}\n{body}")
    }
}
