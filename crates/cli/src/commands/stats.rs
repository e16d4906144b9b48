//! Stats command handler.
//!
//! Shows what the current index was built from.

use clap::Args;
use sage_core::{config::AppConfig, AppResult};
use sage_knowledge::CorpusIndex;

/// Show statistics of the current index
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let index_dir = config.index_dir();
        tracing::info!(index = %index_dir.display(), "Executing stats command");

        let result = CorpusIndex::load(&index_dir);
        let stats = if self.json {
            result.map_err(super::report_failure)?.stats()
        } else {
            result?.stats()
        };

        if self.json {
            super::print_json(&stats)?;
        } else {
            println!("Index:      {}", index_dir.display());
            println!("Built at:   {}", stats.built_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("Chunks:     {}", stats.chunks_count);
            println!("Sources:    {}", stats.sources_count);
            println!(
                "Embedding:  {}/{} ({} dimensions)",
                stats.embedding_provider, stats.embedding_model, stats.dimensions
            );
            println!(
                "Chunking:   {} chars, {} overlap",
                stats.chunk_size, stats.chunk_overlap
            );
        }

        Ok(())
    }
}
