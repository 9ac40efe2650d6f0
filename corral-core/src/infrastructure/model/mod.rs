//! Completion provider seam.
//!
//! The transport to the remote model (HTTP client, auth) lives outside this
//! crate; callers adapt it by implementing [`CompletionProvider`].

mod traits;
mod types;

pub use traits::CompletionProvider;
pub use types::{CompletionRequest, CompletionResponse, ProviderError, StopReason, Usage};
