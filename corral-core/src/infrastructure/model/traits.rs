//! Model traits

use super::types::{CompletionRequest, CompletionResponse, ProviderError};
use async_trait::async_trait;

/// A remote completion service.
///
/// Implementations own their per-call timeouts and classify failures as
/// transient (retried by the loop) or fatal.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, ProviderError>;
}

