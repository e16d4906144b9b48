//! Offline index build: load, chunk, embed, index, persist.

use crate::chunker::{chunk_text, validate_params};
use crate::embeddings::Embedder;
use crate::loader::load_corpus_with_progress;
use crate::progress::ProgressReporter;
use crate::store::{BuildIdentity, CorpusIndex};
use crate::types::{BuildStats, Chunk};
use sage_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;
use std::time::Instant;

/// Inputs of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParams {
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl BuildParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            corpus_dir: config.corpus_dir(),
            index_dir: config.index_dir(),
            chunk_size: config.corpus.chunk_size,
            chunk_overlap: config.corpus.chunk_overlap,
        }
    }
}

/// Build a corpus index and publish it as the current generation.
///
/// Documents that fail extraction are skipped. A corpus that yields no
/// chunks at all is a data error and leaves the index directory untouched.
pub async fn build_index(
    params: &BuildParams,
    embedder: &Embedder,
    progress: &ProgressReporter,
) -> AppResult<BuildStats> {
    let start = Instant::now();
    validate_params(params.chunk_size, params.chunk_overlap)?;
    embedder.warn_if_not_semantic();

    tracing::info!(
        corpus = %params.corpus_dir.display(),
        index = %params.index_dir.display(),
        "Starting index build"
    );

    let report = load_corpus_with_progress(&params.corpus_dir, |done, total, path| {
        progress.load(done, total, &path.display().to_string());
    })?;

    let mut chunks: Vec<Chunk> = Vec::new();
    let documents = report.documents.len();
    for (i, document) in report.documents.iter().enumerate() {
        let doc_chunks = chunk_text(
            &document.source,
            &document.text,
            params.chunk_size,
            params.chunk_overlap,
        )?;
        chunks.extend(doc_chunks);
        progress.chunk(i + 1, documents, chunks.len());
    }

    if chunks.is_empty() {
        return Err(AppError::Data(format!(
            "No text could be extracted from {} ({} documents loaded, {} skipped)",
            params.corpus_dir.display(),
            documents,
            report.skipped.len()
        )));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let total = texts.len();
    let vectors = embedder
        .embed_many_with_progress(&texts, |done| {
            progress.embed(done, total, embedder.model_name());
        })
        .await?;

    let identity = BuildIdentity {
        embedding_provider: embedder.provider_name().to_string(),
        embedding_model: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        chunk_size: params.chunk_size,
        chunk_overlap: params.chunk_overlap,
    };
    let corpus = CorpusIndex::build(chunks, &vectors, identity)?;

    let generation = corpus.save(&params.index_dir)?;
    progress.index(1, 1, &format!("published {}", generation.display()));

    let stats = BuildStats {
        documents_loaded: documents as u32,
        documents_skipped: report.skipped.len() as u32,
        chunks_count: corpus.len() as u32,
        dimensions: corpus.dimensions(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        documents = stats.documents_loaded,
        skipped = stats.documents_skipped,
        chunks = stats.chunks_count,
        duration_secs = stats.duration_secs,
        "Index build complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{BuildPhase, ProgressEvent};
    use crate::store::index_exists;
    use sage_core::config::EmbeddingConfig;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn params(root: &TempDir, chunk_size: usize, chunk_overlap: usize) -> BuildParams {
        BuildParams {
            corpus_dir: root.path().join("corpus"),
            index_dir: root.path().join("index"),
            chunk_size,
            chunk_overlap,
        }
    }

    fn mock_embedder() -> Embedder {
        Embedder::from_config(&EmbeddingConfig::default(), None).unwrap()
    }

    #[tokio::test]
    async fn test_build_persists_loadable_index() {
        let root = TempDir::new().unwrap();
        let corpus = root.path().join("corpus");
        fs::create_dir_all(&corpus).unwrap();
        fs::write(corpus.join("a.txt"), "a".repeat(2500)).unwrap();
        fs::write(corpus.join("b.md"), "# Title\n\nShort note.").unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Arc::new(move |e: ProgressEvent| {
            sink.lock().unwrap().push(e)
        }));

        let params = params(&root, 1000, 200);
        let stats = build_index(&params, &mock_embedder(), &reporter)
            .await
            .unwrap();

        // 2500 chars at window 1000 / stride 800: starts 0, 800, 1600
        assert_eq!(stats.documents_loaded, 2);
        assert_eq!(stats.documents_skipped, 0);
        assert_eq!(stats.chunks_count, 4);
        assert_eq!(stats.dimensions, 384);

        let loaded = CorpusIndex::load(&params.index_dir).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.manifest().chunk_size, 1000);
        assert_eq!(loaded.chunk(0).unwrap().source, "a.txt");
        assert_eq!(loaded.chunk(3).unwrap().source, "b.md");

        let phases: Vec<BuildPhase> = events.lock().unwrap().iter().map(|e| e.phase).collect();
        assert_eq!(phases.first(), Some(&BuildPhase::Load));
        assert_eq!(phases.last(), Some(&BuildPhase::Index));
        assert!(phases.contains(&BuildPhase::Embed));
    }

    #[tokio::test]
    async fn test_empty_corpus_is_data_error_and_writes_nothing() {
        let root = TempDir::new().unwrap();
        let corpus = root.path().join("corpus");
        fs::create_dir_all(&corpus).unwrap();
        fs::write(corpus.join("empty.txt"), "").unwrap();

        let params = params(&root, 1000, 200);
        let result = build_index(&params, &mock_embedder(), &ProgressReporter::noop()).await;

        assert!(matches!(result, Err(AppError::Data(_))));
        assert!(!index_exists(&params.index_dir));
    }

    #[tokio::test]
    async fn test_invalid_chunk_params_rejected_before_loading() {
        let root = TempDir::new().unwrap();
        // Corpus directory deliberately missing
        let params = params(&root, 100, 100);
        let result = build_index(&params, &mock_embedder(), &ProgressReporter::noop()).await;
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("overlap")));
    }

    #[tokio::test]
    async fn test_missing_corpus_dir_is_config_error() {
        let root = TempDir::new().unwrap();
        let params = params(&root, 1000, 200);
        let result = build_index(&params, &mock_embedder(), &ProgressReporter::noop()).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
