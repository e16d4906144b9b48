//! Hosted feature-extraction embedding provider.
//!
//! Talks to a Hugging Face style inference endpoint: `POST {endpoint}` with
//! `{"inputs": [...]}` and a bearer token. Token-level responses are
//! mean-pooled into sentence vectors. Network failures and 5xx responses are
//! retried with backoff; a rejected credential is not.

use crate::embeddings::pooling::FeatureOutput;
use crate::embeddings::retry::with_backoff;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use sage_core::config::EmbeddingConfig;
use sage_core::{AppError, AppResult};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";

#[derive(Debug, Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a [String],
    options: FeatureOptions,
}

#[derive(Debug, Serialize)]
struct FeatureOptions {
    wait_for_model: bool,
}

/// Remote inference API provider.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl RemoteProvider {
    /// Create a provider for `config.model`.
    ///
    /// Without an explicit endpoint the public feature-extraction pipeline
    /// for the model is used.
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let url = match &config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "{}/{}/pipeline/feature-extraction",
                DEFAULT_INFERENCE_URL, config.model
            ),
        };

        Ok(Self {
            client,
            url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// One feature-extraction request (no retries)
    async fn request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Sending feature-extraction request to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&FeatureRequest {
                inputs: texts,
                options: FeatureOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to reach embedding API: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AppError::Config(format!(
                "Embedding API rejected the credential ({})",
                status
            )));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Backend(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let output: FeatureOutput = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to parse embedding response: {}", e)))?;

        output.into_sentence_vectors(texts.len())
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteProvider {
    fn provider_name(&self) -> &str {
        "remote"
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

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "remote", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        with_backoff("Remote embedding", || self.request(texts)).await
    }
}
