//! The Provider trait — the seam between the debate engine and model backends.

use super::error::Result;
use super::types::*;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Boxed stream of incremental generation events.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// An LLM backend. Injected explicitly into every component that calls the
/// model (engine, working memory, episodic compressor) so tests can substitute
/// a scripted fake.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Single-shot completion.
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse>;

    /// Streamed completion yielding text deltas.
    async fn stream(&self, request: LLMRequest) -> Result<ProviderStream>;

    /// Structured extraction: force the request's tool and return its input
    /// payload. `Ok(None)` means the model produced no usable tool call —
    /// callers treat that as a fail-soft no-op, not an error.
    async fn extract(&self, request: LLMRequest) -> Result<Option<serde_json::Value>> {
        let response = self.complete(request).await?;
        Ok(response.tool_input().cloned())
    }

    /// Provider name (for logging).
    fn name(&self) -> &str;

    /// Model used when the request does not specify one.
    fn default_model(&self) -> &str;
}
