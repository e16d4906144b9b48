//! Embedding engine.
//!
//! One `Embedder` serves both the offline build (batched, concurrent) and
//! online queries. Backends are interchangeable `EmbeddingProvider`s chosen
//! by configuration.

pub mod pooling;
pub mod provider;
pub mod providers;
pub mod retry;

pub use provider::{create_provider, EmbeddingProvider};

use futures::stream::{self, StreamExt, TryStreamExt};
use sage_core::config::EmbeddingConfig;
use sage_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Validating front end over an embedding provider.
///
/// Every vector it hands out has exactly `dimensions` components; anything
/// else from the backend is a configuration error.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    normalize: bool,
    batch_size: usize,
    concurrency: usize,
    timeout: Duration,
}

impl Embedder {
    /// Wrap a provider using the batching and timeout settings of `config`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self {
            dimensions: provider.dimensions(),
            provider,
            normalize: config.normalize,
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Create the configured provider and wrap it.
    pub fn from_config(config: &EmbeddingConfig, api_key: Option<&str>) -> AppResult<Self> {
        let provider = create_provider(config, api_key)?;

        tracing::debug!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            dimensions = provider.dimensions(),
            "Created embedder"
        );

        Ok(Self::new(provider, config))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_semantic(&self) -> bool {
        self.provider.is_semantic()
    }

    /// Warn when vectors come from a non-semantic stand-in provider.
    pub(crate) fn warn_if_not_semantic(&self) {
        if !self.is_semantic() {
            tracing::warn!(
                provider = self.provider_name(),
                model = self.model_name(),
                "Embedding provider is not semantic; retrieval only matches shared words. \
                 Set embedding.provider to ollama or remote for real use"
            );
        }
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_chunk(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Backend("No embedding returned".to_string()))
    }

    /// Embed many texts, preserving input order.
    pub async fn embed_many(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.embed_many_with_progress(texts, |_| {}).await
    }

    /// Embed many texts, calling `on_progress` with the running count of
    /// embedded texts after each batch completes.
    ///
    /// Up to `concurrency` batches are in flight; results still come back in
    /// input order.
    pub async fn embed_many_with_progress<F>(
        &self,
        texts: &[String],
        on_progress: F,
    ) -> AppResult<Vec<Vec<f32>>>
    where
        F: Fn(usize),
    {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            "Embedding {} texts with {} (model: {}, batch: {}, concurrency: {})",
            texts.len(),
            self.provider_name(),
            self.model_name(),
            self.batch_size,
            self.concurrency
        );

        let mut done = 0usize;
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| self.embed_chunk(batch))
            .buffered(self.concurrency)
            .inspect_ok(|batch| {
                done += batch.len();
                on_progress(done);
            })
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// One batch, checked for shape.
    ///
    /// Providers that bound each of their own requests are trusted with the
    /// timeout; a batch may span several requests and retries. Otherwise the
    /// whole batch is one request and is bounded here.
    async fn embed_chunk(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = if self.provider.bounds_each_request() {
            self.provider.embed_batch(texts).await?
        } else {
            tokio::time::timeout(self.timeout, self.provider.embed_batch(texts))
                .await
                .map_err(|_| {
                    AppError::Backend(format!(
                        "Embedding request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                })??
        };

        if vectors.len() != texts.len() {
            return Err(AppError::Backend(format!(
                "Embedding backend returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        for vector in &mut vectors {
            self.check_dimensions(vector.len())?;
            if self.normalize {
                pooling::l2_normalize(vector);
            }
        }

        Ok(vectors)
    }

    fn check_dimensions(&self, actual: usize) -> AppResult<()> {
        if actual != self.dimensions {
            return Err(AppError::Config(format!(
                "Embedding dimension mismatch: model '{}' produced {} dimensions, expected {}",
                self.model_name(),
                actual,
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider returning vectors of a fixed length, whatever it claims.
    #[derive(Debug)]
    struct FixedLengthProvider {
        claimed: usize,
        actual: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedLengthProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }
        fn model_name(&self) -> &str {
            "fixed-v1"
        }
        fn dimensions(&self) -> usize {
            self.claimed
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.actual];
                    v[0] = t.len() as f32;
                    v
                })
                .collect())
        }
    }

    /// Provider that never answers in time.
    #[derive(Debug)]
    struct StalledProvider;

    #[async_trait]
    impl EmbeddingProvider for StalledProvider {
        fn provider_name(&self) -> &str {
            "stalled"
        }
        fn model_name(&self) -> &str {
            "stalled"
        }
        fn dimensions(&self) -> usize {
            4
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    /// Provider issuing one bounded request per text, each taking `per_text`.
    #[derive(Debug)]
    struct SequentialProvider {
        per_text: Duration,
    }

    #[async_trait]
    impl EmbeddingProvider for SequentialProvider {
        fn provider_name(&self) -> &str {
            "sequential"
        }
        fn model_name(&self) -> &str {
            "sequential"
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn bounds_each_request(&self) -> bool {
            true
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            let mut vectors = Vec::with_capacity(texts.len());
            for _ in texts {
                tokio::time::sleep(self.per_text).await;
                vectors.push(vec![1.0, 0.0]);
            }
            Ok(vectors)
        }
    }

    fn settings(batch_size: usize, concurrency: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            batch_size,
            concurrency,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_embed_many_preserves_order_across_batches() {
        let provider = Arc::new(FixedLengthProvider {
            claimed: 3,
            actual: 3,
            calls: AtomicUsize::new(0),
        });
        let embedder = Embedder::new(provider.clone(), &settings(2, 3));

        let texts: Vec<String> = (1..=7).map(|n| "x".repeat(n)).collect();
        let vectors = embedder.embed_many(&texts).await.unwrap();

        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_progress_reaches_total() {
        let embedder = Embedder::from_config(&settings(4, 2), None).unwrap();
        let texts: Vec<String> = (0..10).map(|i| format!("text number {}", i)).collect();

        let seen = Mutex::new(Vec::new());
        embedder
            .embed_many_with_progress(&texts, |n| seen.lock().unwrap().push(n))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![4, 8, 10]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_config_error() {
        let provider = Arc::new(FixedLengthProvider {
            claimed: 384,
            actual: 768,
            calls: AtomicUsize::new(0),
        });
        let embedder = Embedder::new(provider, &settings(8, 1));

        let result = embedder.embed("question").await;
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("dimension mismatch")));
    }

    #[tokio::test]
    async fn test_normalize_flag() {
        let provider = Arc::new(FixedLengthProvider {
            claimed: 2,
            actual: 2,
            calls: AtomicUsize::new(0),
        });
        let config = EmbeddingConfig {
            normalize: true,
            ..settings(8, 1)
        };
        let embedder = Embedder::new(provider, &config);

        let vector = embedder.embed("abcd").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_timeout_is_backend_error() {
        let config = EmbeddingConfig {
            timeout_secs: 1,
            ..settings(8, 1)
        };
        let embedder = Embedder::new(Arc::new(StalledProvider), &config);

        let result = embedder.embed("hello").await;
        assert!(matches!(result, Err(AppError::Backend(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_slow_batch_within_per_request_timeout() {
        // 8 requests of 200ms: the batch takes longer than the 1s timeout,
        // but no single request does.
        let config = EmbeddingConfig {
            timeout_secs: 1,
            ..settings(8, 1)
        };
        let provider = SequentialProvider {
            per_text: Duration::from_millis(200),
        };
        let embedder = Embedder::new(Arc::new(provider), &config);

        let texts: Vec<String> = (0..8).map(|i| format!("text {}", i)).collect();
        let vectors = embedder.embed_many(&texts).await.unwrap();
        assert_eq!(vectors.len(), 8);
    }

    #[test]
    fn test_default_provider_is_not_semantic() {
        let mock = Embedder::from_config(&EmbeddingConfig::default(), None).unwrap();
        assert!(!mock.is_semantic());

        let ollama = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert!(Embedder::from_config(&ollama, None).unwrap().is_semantic());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let embedder = Embedder::from_config(&EmbeddingConfig::default(), None).unwrap();
        assert!(embedder.embed_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = Embedder::from_config(&EmbeddingConfig::default(), None).unwrap();
        let texts = vec!["same text".to_string(), "same text".to_string()];
        let vectors = embedder.embed_many(&texts).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0], embedder.embed("same text").await.unwrap());
    }
}
