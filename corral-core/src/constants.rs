//! Defaults and reserved strings shared by config and runtime.

/// Provider calls allowed per session.
pub const DEFAULT_MAX_ITERATIONS: u32 = 30;

/// Cumulative provider-reported output tokens allowed per session.
pub const DEFAULT_MAX_TOTAL_OUTPUT_TOKENS: u64 = 100_000;

/// Wall-clock budget per session, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Output-token cap sent with every provider call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Identical tool calls tolerated before the repeat guard trips.
pub const DEFAULT_REPEAT_THRESHOLD: u32 = 2;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_RETRY_JITTER_MS: u64 = 250;

/// User input that ends an interactive session.
pub const DEFAULT_END_OF_CONVERSATION: &str = "exit";

/// Prefix of the marker line a model uses to report a durable fact.
pub const ENTITY_MARKER_PREFIX: &str = "ENTITY:";

/// Entity that receives marker facts without an explicit `<entity>.` prefix.
pub const SESSION_ENTITY_ID: &str = "session";

/// Heading of the synthetic context turn built from the entity store.
pub const ENTITY_CONTEXT_HEADING: &str = "Known facts from earlier in this session:";
