//! Sage knowledge: grounded question answering over a document corpus.
//!
//! Offline, [`build_index`] loads the corpus, chunks it, embeds every chunk
//! and persists a [`CorpusIndex`]. Online, [`RagService`] retrieves the
//! nearest chunks for a question and asks the generation backend for an
//! answer grounded in them.

pub mod build;
pub mod chunker;
pub mod embeddings;
pub mod loader;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod testing;

pub use build::{build_index, BuildParams};
pub use embeddings::{Embedder, EmbeddingProvider};
pub use progress::{BuildPhase, ProgressEvent, ProgressReporter};
pub use rag::{unique_sources, Answer, AnswerSynthesizer, AskResponse, HealthStatus, RagService};
pub use retriever::Retriever;
pub use store::{index_exists, CorpusIndex};
pub use types::{BuildStats, Chunk, IndexManifest, IndexStats, RetrievalResult, RetrievedChunk};
pub use vector_index::{FlatL2Index, VectorIndex};
