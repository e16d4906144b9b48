//! Query-time retrieval: embed the question, search, map back to chunks.

use crate::embeddings::Embedder;
use crate::store::CorpusIndex;
use crate::types::{RetrievalResult, RetrievedChunk};
use crate::vector_index::VectorIndex;
use sage_core::{AppError, AppResult};

/// Retrieves the chunks nearest to a question.
///
/// No re-ranking, filtering or source deduplication happens here; duplicate
/// chunk texts may appear more than once.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Embedder,
}

impl Retriever {
    pub fn new(embedder: Embedder) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// The `k` chunks nearest to `question`, nearest first.
    #[tracing::instrument(skip(self, question, corpus), fields(question_len = question.len()))]
    pub async fn retrieve(
        &self,
        question: &str,
        corpus: &CorpusIndex,
        k: usize,
    ) -> AppResult<RetrievalResult> {
        let query = self.embedder.embed(question).await?;
        if query.len() != corpus.dimensions() {
            return Err(AppError::Config(format!(
                "Embedding dimension mismatch: query has {} dimensions, index has {}",
                query.len(),
                corpus.dimensions()
            )));
        }

        let hits = corpus.index().search(&query, k)?;

        let results = hits
            .into_iter()
            .map(|(position, distance)| {
                let chunk = corpus.chunk(position).ok_or_else(|| {
                    AppError::Config(format!("Index position {} has no chunk", position))
                })?;
                Ok(RetrievedChunk {
                    chunk: chunk.clone(),
                    distance,
                })
            })
            .collect::<AppResult<RetrievalResult>>()?;

        tracing::debug!(
            retrieved = results.len(),
            nearest = results.first().map(|r| r.distance),
            "Retrieved chunks"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed_corpus, fixed_embedder};

    fn corpus() -> CorpusIndex {
        fixed_corpus(
            &[
                ("a.pdf", "first chunk"),
                ("a.pdf", "second chunk"),
                ("b.pdf", "third chunk"),
            ],
            vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]],
        )
    }

    #[tokio::test]
    async fn test_identical_embedding_ranks_first_with_zero_distance() {
        let retriever = Retriever::new(fixed_embedder(2, &[("q", vec![3.0, 4.0])]));
        let results = retriever.retrieve("q", &corpus(), 3).await.unwrap();

        assert_eq!(results[0].chunk.text, "second chunk");
        assert_eq!(results[0].distance, 0.0);
        let distances: Vec<f32> = results.iter().map(|r| r.distance).collect();
        assert_eq!(distances, vec![0.0, 20.0, 25.0]);
    }

    #[tokio::test]
    async fn test_top_k_larger_than_corpus_is_clamped() {
        let retriever = Retriever::new(fixed_embedder(2, &[("q", vec![0.0, 0.0])]));
        let results = retriever.retrieve("q", &corpus(), 50).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_chunks_are_not_collapsed() {
        let corpus = fixed_corpus(
            &[("a.pdf", "same"), ("a.pdf", "same"), ("b.pdf", "other")],
            vec![vec![1.0], vec![1.0], vec![9.0]],
        );
        let retriever = Retriever::new(fixed_embedder(1, &[("q", vec![1.0])]));

        let results = retriever.retrieve("q", &corpus, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, results[1].chunk.text);
        assert_eq!(results[0].distance, results[1].distance);
        assert_eq!(results[0].chunk.position, 0);
        assert_eq!(results[1].chunk.position, 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_config_error() {
        // Embedder produces 3-dim vectors, index holds 2-dim ones
        let retriever = Retriever::new(fixed_embedder(3, &[("q", vec![1.0, 2.0, 3.0])]));
        let result = retriever.retrieve("q", &corpus(), 1).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let retriever = Retriever::new(fixed_embedder(2, &[]));
        let result = retriever.retrieve("unknown", &corpus(), 1).await;
        assert!(matches!(result, Err(AppError::Backend(_))));
    }
}
