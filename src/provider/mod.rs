//! LLM Provider Abstraction Layer
//!
//! Provides a unified interface for the two model capabilities the debate
//! engine consumes: streamed free-text generation and single-shot structured
//! extraction (a forced tool call returning one typed payload, or none).

pub mod anthropic;
pub mod error;
pub mod factory;
pub mod mock;
pub mod retry;
mod r#trait;
pub mod types;

// Re-exports
pub use anthropic::AnthropicProvider;
pub use error::{ProviderError, Result};
pub use factory::create_provider;
pub use mock::{MockProvider, MockResponse};
pub use r#trait::{Provider, ProviderStream};
pub use types::*;
