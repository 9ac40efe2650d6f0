//! Session-scoped entity memory.

mod extractors;
mod marker;
mod store;

pub use extractors::{EntityExtractor, EntityExtractors, FieldExtractor};
pub use marker::{EntityFact, parse_entity_markers};
pub use store::{EntityRecord, EntityStore};
