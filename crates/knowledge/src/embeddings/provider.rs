//! Embedding provider trait and factory.

use super::providers::{MockProvider, OllamaProvider, RemoteProvider};
use sage_core::config::EmbeddingConfig;
use sage_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a fixed model: the same text
/// always yields the same vector.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama", "remote")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Whether nearby vectors mean related text. False for offline stand-ins.
    fn is_semantic(&self) -> bool {
        true
    }

    /// Whether the provider applies the per-request timeout itself.
    ///
    /// Providers that answer a batch with several backend requests must
    /// bound each one and return `true`; the caller then leaves the batch
    /// unbounded.
    fn bounds_each_request(&self) -> bool {
        false
    }

    /// Generate embeddings for multiple texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Backend("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// Credentials are checked here so that a missing key fails the build or
/// startup, not the first query.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(&config.model, config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        "remote" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "Embedding provider 'remote' requires an API key (set {})",
                    config.api_key_env.as_deref().unwrap_or("apiKeyEnv")
                ))
            })?;
            Ok(Arc::new(RemoteProvider::new(config, api_key)?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, remote",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&config("mock"), None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider_is_lazy() {
        // No connection is made at construction
        let provider = create_provider(&config("ollama"), None).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_remote_requires_api_key() {
        let result = create_provider(&config("remote"), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_create_remote_provider() {
        let provider = create_provider(&config("remote"), Some("hf_test")).unwrap();
        assert_eq!(provider.provider_name(), "remote");
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&config("unknown"), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&config("mock"), None).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
