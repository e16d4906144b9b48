//! Index command handler.
//!
//! Builds the corpus index that `ask` and `chat` serve from.

use clap::{Args, Subcommand};
use sage_core::{config::AppConfig, AppResult};
use sage_knowledge::{build_index, BuildParams, Embedder, ProgressEvent, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Build and inspect the corpus index
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Load the corpus, embed it and publish a new index generation
    Build(IndexBuildCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
        }
    }
}

/// Build a new index generation
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Corpus directory (overrides corpus.dir)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Index directory (overrides index.dir)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Window size in characters (overrides corpus.chunkSize)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive windows (overrides corpus.chunkOverlap)
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output build statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut config = config.clone();
        if let Some(ref dir) = self.corpus {
            config.corpus.dir = dir.clone();
        }
        if let Some(ref dir) = self.index {
            config.index.dir = dir.clone();
        }
        if let Some(size) = self.chunk_size {
            config.corpus.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.corpus.chunk_overlap = overlap;
        }
        config.validate()?;

        let params = BuildParams::from_config(&config);
        tracing::info!(
            corpus = %params.corpus_dir.display(),
            chunk_size = params.chunk_size,
            chunk_overlap = params.chunk_overlap,
            "Executing index build"
        );

        let api_key = config.resolve_embedding_api_key()?;
        let embedder = Embedder::from_config(&config.embedding, api_key.as_deref())?;

        let progress = if self.quiet || self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple())
            }))
        };

        let result = build_index(&params, &embedder, &progress).await;
        let stats = if self.json {
            result.map_err(super::report_failure)?
        } else {
            result?
        };

        if self.json {
            super::print_json(&stats)?;
        } else {
            println!(
                "Indexed {} chunks from {} documents ({} skipped) in {:.2}s",
                stats.chunks_count,
                stats.documents_loaded,
                stats.documents_skipped,
                stats.duration_secs
            );
            println!("Index: {}", params.index_dir.display());
        }

        Ok(())
    }
}
