//! Generation client factory.
//!
//! Resolves the configured provider into a concrete client. Missing
//! credentials are reported here, at startup, rather than on the first request.

use crate::client::LlmClient;
use crate::providers::{openai::DEFAULT_OPENAI_URL, OllamaClient, OpenAiClient};
use sage_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a generation client.
///
/// # Arguments
/// * `kind` - Client implementation ("ollama", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required by "openai")
/// * `timeout` - Per-request timeout
pub fn create_client(
    kind: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match kind.to_lowercase().as_str() {
        "ollama" => {
            let client = match endpoint {
                Some(url) => OllamaClient::with_base_url(url, timeout)?,
                None => OllamaClient::new(timeout)?,
            };
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI-compatible provider requires API key".to_string())
            })?;
            let client =
                OpenAiClient::new(endpoint.unwrap_or(DEFAULT_OPENAI_URL), api_key, timeout)?;
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", kind))),
    }
}

/// Create the generation client for the active provider of `config`.
pub fn create_client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let kind = config.provider_kind(&config.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown provider: {}", config.provider))
    })?;

    let endpoint = config
        .get_provider_config(&config.provider)
        .and_then(|pc| pc.endpoint());
    let api_key = config.resolve_api_key(&config.provider)?;

    tracing::debug!(
        provider = %config.provider,
        kind,
        endpoint = ?endpoint,
        "Creating generation client"
    );

    create_client(
        kind,
        endpoint,
        api_key.as_deref(),
        Duration::from_secs(config.generation.timeout_secs),
    )
}
