//! Tool schemas, the capability map, and dispatch with repeat detection.

mod dispatch;
mod error;
mod guard;
mod interface;
mod registry;
mod schema;

pub(crate) use dispatch::{DispatchOutcome, ToolCall, ToolDispatcher};
pub use dispatch::ToolStep;
pub use error::ToolInvokeError;
pub use guard::{RepeatGuard, RepeatVerdict, ToolCallKey};
pub use interface::{ToolExecutor, ToolOutput, ToolSchemaSource};
pub use registry::{RegisteredTool, ToolRegistry};
pub use schema::{SchemaError, SchemaOverlay, ToolSchema, enrich_schema};
