//! Provider Factory
//!
//! Centralized provider creation from configuration.

use super::{AnthropicProvider, Provider};
use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;

/// Create the configured provider. Fails fast when no API key can be
/// resolved — the server cannot generate turns without one.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config.provider.resolve_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured. Set provider.api_key in the config file \
             or export ANTHROPIC_API_KEY."
        )
    })?;

    let mut provider =
        AnthropicProvider::new(api_key, config.provider.generation_model.clone());
    if let Some(base_url) = &config.provider.base_url {
        tracing::info!("Using custom provider endpoint: {}", base_url);
        provider = provider.with_base_url(base_url.clone());
    }

    tracing::info!(
        "Provider ready: {} (generation={}, extraction={})",
        provider.name(),
        config.provider.generation_model,
        config.provider.extraction_model
    );
    Ok(Arc::new(provider))
}
