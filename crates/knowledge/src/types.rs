//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the on-disk index layout.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// A fixed-size window of a source document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, verbatim from the document
    pub text: String,

    /// Source document identifier (file name)
    pub source: String,

    /// 0-based ordinal within its source
    pub position: u32,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>, position: u32) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            position,
        }
    }
}

/// A chunk returned by the retriever with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,

    /// Squared L2 distance; lower is nearer
    pub distance: f32,
}

/// Retrieved chunks, nearest first, at most `top_k` long.
pub type RetrievalResult = Vec<RetrievedChunk>;

/// Identity of a built index.
///
/// Written into both persisted artifacts; they are only served together when
/// their manifests are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_count: usize,

    /// SHA-256 over the chunk store, hex encoded
    pub chunks_sha256: String,

    pub built_at: DateTime<Utc>,
}

/// Statistics from a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents that produced text
    pub documents_loaded: u32,

    /// Documents skipped because extraction failed
    pub documents_skipped: u32,

    /// Number of chunks indexed
    pub chunks_count: u32,

    /// Embedding dimension
    pub dimensions: usize,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub chunks_count: usize,
    pub sources_count: usize,
    pub dimensions: usize,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub built_at: DateTime<Utc>,
}
