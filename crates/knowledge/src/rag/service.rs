//! Question service over a loaded corpus index.

use crate::embeddings::Embedder;
use crate::rag::synthesizer::AnswerSynthesizer;
use crate::rag::types::{AskResponse, HealthStatus};
use crate::retriever::Retriever;
use crate::store::CorpusIndex;
use sage_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Serves questions against one immutable corpus index.
///
/// The index is shared read-only; concurrent `ask` calls need no locking.
pub struct RagService {
    corpus: Arc<CorpusIndex>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl RagService {
    /// Assemble a service from its parts.
    ///
    /// Fails if `embedder` cannot produce queries comparable with the
    /// vectors in `corpus`.
    pub fn new(
        corpus: Arc<CorpusIndex>,
        embedder: Embedder,
        synthesizer: AnswerSynthesizer,
    ) -> AppResult<Self> {
        corpus.check_embedder(
            embedder.provider_name(),
            embedder.model_name(),
            embedder.dimensions(),
        )?;

        Ok(Self {
            corpus,
            retriever: Retriever::new(embedder),
            synthesizer,
        })
    }

    /// Load the current index and wire up the configured backends.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        let index_dir = config.index_dir();
        let corpus = CorpusIndex::load(&index_dir)?;

        let api_key = config.resolve_embedding_api_key()?;
        let embedder = Embedder::from_config(&config.embedding, api_key.as_deref())?;
        let synthesizer = AnswerSynthesizer::from_config(config)?;

        tracing::info!(
            chunks = corpus.len(),
            provider = %config.provider,
            model = %config.model,
            "Service ready"
        );
        embedder.warn_if_not_semantic();

        Self::new(Arc::new(corpus), embedder, synthesizer)
    }

    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }

    /// Answer a question from the `top_k` nearest chunks.
    ///
    /// Input is validated before any backend is called.
    pub async fn ask(&self, question: &str, top_k: usize) -> AppResult<AskResponse> {
        if question.trim().is_empty() {
            return Err(AppError::Input("Question must not be empty".to_string()));
        }
        if top_k < 1 {
            return Err(AppError::Input("top_k must be at least 1".to_string()));
        }

        let retrieved = self.retriever.retrieve(question, &self.corpus, top_k).await?;
        let answer = self.synthesizer.synthesize(&retrieved, question).await?;

        tracing::info!(
            top_k,
            retrieved = retrieved.len(),
            sources = answer.sources.len(),
            "Answered question"
        );

        Ok(AskResponse::new(answer, top_k))
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            chunks: self.corpus.len(),
        }
    }
}
