//! Completion gateway for email-extract.
//!
//! The pipeline only sees `LlmProvider`: an explicitly constructed client that
//! is passed into the orchestrator, so tests can swap in a stub.
//!
//! Uses the rig-core crate for HTTP transport against any OpenAI-compatible
//! chat-completions endpoint (Groq by default), and `RigAdapter` to bridge it
//! to our `LlmProvider` trait.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider_name: String,
    pub api_key: secrecy::SecretString,
    pub base_url: String,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::groq;

    let base_url = config.base_url.trim_end_matches('/');
    let client: groq::Client = groq::Client::builder()
        .api_key(config.api_key.expose_secret())
        .base_url(base_url)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: config.provider_name.clone(),
            reason: format!("Failed to create client: {}", e),
        })?;

    tracing::info!("Using {} (endpoint: {})", config.provider_name, base_url);
    Ok(Arc::new(RigAdapter::new(
        client,
        config.provider_name.clone(),
        config.timeout,
    )))
}
