//! Ollama Embedding Provider
//!
//! Semantic embeddings from a local Ollama server (`/api/embeddings`), e.g.
//! `all-minilm` (384-dim) or `nomic-embed-text` (768-dim).
//!
//! Embedding requests are idempotent, so transient failures are retried with
//! exponential backoff. Each HTTP request carries the configured timeout.

use crate::embeddings::retry::with_backoff;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use sage_core::config::EmbeddingConfig;
use sage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embedding.
    ///
    /// The endpoint comes from the configuration, then `OLLAMA_URL`, then the
    /// local default.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Embed single text with retry logic
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        with_backoff("Ollama embedding", || self.embed_single(text)).await
    }

    /// Embed single text (no retries)
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(AppError::Backend(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bounds_each_request(&self) -> bool {
        true
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Input("Cannot embed empty text".to_string()));
        }

        self.embed_with_retries(text).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        // The embeddings endpoint takes one prompt per request.
        let mut embeddings = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                warn!("Embedding whitespace-only text at index {} as zero vector", i);
                embeddings.push(vec![0.0; self.dimensions]);
                continue;
            }

            embeddings.push(self.embed_with_retries(text).await?);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::Embedder;
    use crate::testing::serve_http;
    use std::sync::Arc;

    fn create_test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_from_config() {
        let config = EmbeddingConfig {
            endpoint: Some("http://gpu-box:11434/".to_string()),
            ..create_test_config()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "http://gpu-box:11434");
        assert_eq!(provider.model_name(), "all-minilm");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let provider = OllamaProvider::new(&create_test_config()).unwrap();
        let result = provider.embed("   ").await;
        assert!(matches!(result, Err(AppError::Input(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_backend_error() {
        let config = EmbeddingConfig {
            endpoint: Some("http://127.0.0.1:1".to_string()),
            timeout_secs: 2,
            ..create_test_config()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        let result = provider.embed("hello").await;
        assert!(matches!(result, Err(AppError::Backend(_))));
    }

    #[tokio::test]
    async fn test_slow_server_batch_longer_than_timeout() {
        let server = serve_http(
            vec![(200, r#"{"embedding":[0.5,0.5]}"#.to_string())],
            Duration::from_millis(200),
        )
        .await;
        let config = EmbeddingConfig {
            endpoint: Some(server.url.clone()),
            dimensions: 2,
            timeout_secs: 1,
            batch_size: 8,
            ..create_test_config()
        };
        let embedder = Embedder::new(Arc::new(OllamaProvider::new(&config).unwrap()), &config);

        let texts: Vec<String> = (0..8).map(|i| format!("text {}", i)).collect();
        let vectors = embedder.embed_many(&texts).await.unwrap();

        assert_eq!(vectors.len(), 8);
        assert_eq!(server.hits(), 8);
    }

    #[tokio::test]
    async fn test_transient_error_retried() {
        let server = serve_http(
            vec![
                (503, r#"{"error":"model loading"}"#.to_string()),
                (200, r#"{"embedding":[1.0,0.0]}"#.to_string()),
            ],
            Duration::ZERO,
        )
        .await;
        let config = EmbeddingConfig {
            endpoint: Some(server.url.clone()),
            dimensions: 2,
            ..create_test_config()
        };
        let provider = OllamaProvider::new(&config).unwrap();

        assert_eq!(provider.embed("hello").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_embed_batch_live() {
        if !is_ollama_running().await {
            println!("Skipping test: Ollama not running");
            return;
        }

        let provider = OllamaProvider::new(&create_test_config()).unwrap();
        let texts = vec!["First text".to_string(), "Second text".to_string()];

        match provider.embed_batch(&texts).await {
            Ok(embeddings) => {
                assert_eq!(embeddings.len(), 2);
                assert!(embeddings[0].iter().any(|&x| x != 0.0));
            }
            // Model not pulled locally
            Err(e) => println!("Skipping test: {}", e),
        }
    }

    /// Helper to check if Ollama is running
    async fn is_ollama_running() -> bool {
        let Ok(client) = Client::builder().timeout(Duration::from_secs(2)).build() else {
            return false;
        };

        let url = format!("{}/api/tags", DEFAULT_OLLAMA_URL);
        client.get(&url).send().await.is_ok()
    }
}
