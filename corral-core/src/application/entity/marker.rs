//! Parser for `ENTITY:key=value` marker lines in model text.
//!
//! Grammar, one marker per line, surrounding whitespace ignored:
//!
//! ```text
//! marker := "ENTITY:" key "=" value
//! key    := [entity "."] attribute
//! ```
//!
//! A key without an entity prefix targets the reserved `session` entity.
//! Lines that do not match are ignored.

use crate::constants::{ENTITY_MARKER_PREFIX, SESSION_ENTITY_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFact {
    pub entity: String,
    pub key: String,
    pub value: String,
}

pub fn parse_entity_markers(text: &str) -> Vec<EntityFact> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<EntityFact> {
    let body = line.trim().strip_prefix(ENTITY_MARKER_PREFIX)?;
    let (key, value) = body.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }

    let (entity, attribute) = match key.split_once('.') {
        Some((entity, attribute)) => (entity.trim(), attribute.trim()),
        None => (SESSION_ENTITY_ID, key),
    };
    if entity.is_empty() || attribute.is_empty() {
        return None;
    }

    Some(EntityFact {
        entity: entity.to_string(),
        key: attribute.to_string(),
        value: value.to_string(),
    })
}
