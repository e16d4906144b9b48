//! Corpus index and its on-disk generations.
//!
//! Layout under the index directory:
//!
//! ```text
//! CURRENT                     name of the live generation
//! gen-<timestamp>-<hash>/
//!     vectors.bin             bincode: manifest + vectors
//!     chunks.json             JSON: manifest + chunk store
//! ```
//!
//! A generation is written into a staging directory, fsynced, renamed into
//! place, and only then published by replacing `CURRENT`. Readers therefore
//! only ever see complete generations.

use crate::types::{Chunk, IndexManifest, IndexStats, INDEX_FORMAT_VERSION};
use crate::vector_index::{FlatL2Index, VectorIndex};
use chrono::Utc;
use sage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CURRENT_FILE: &str = "CURRENT";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const CHUNKS_FILE: &str = "chunks.json";

const GENERATION_PREFIX: &str = "gen-";
const STAGING_PREFIX: &str = ".staging-";

/// Identity of the embedding configuration and chunking used for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Vectors plus the parallel chunk store. Read-only once constructed.
///
/// Position `i` of the vector index corresponds to `chunks[i]`.
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    manifest: IndexManifest,
    index: FlatL2Index,
    chunks: Vec<Chunk>,
}

#[derive(Deserialize)]
struct VectorArtifact {
    manifest: IndexManifest,
    index: FlatL2Index,
}

#[derive(Serialize, Deserialize)]
struct ChunkArtifact {
    manifest: IndexManifest,
    chunks: Vec<Chunk>,
}

/// Borrowed form of the artifacts, written without cloning the index.
#[derive(Serialize)]
struct VectorArtifactRef<'a> {
    manifest: &'a IndexManifest,
    index: &'a FlatL2Index,
}

#[derive(Serialize)]
struct ChunkArtifactRef<'a> {
    manifest: &'a IndexManifest,
    chunks: &'a [Chunk],
}

impl CorpusIndex {
    /// Build an in-memory corpus index from chunks and their vectors.
    pub fn build(
        chunks: Vec<Chunk>,
        vectors: &[Vec<f32>],
        identity: BuildIdentity,
    ) -> AppResult<Self> {
        if chunks.len() != vectors.len() {
            return Err(AppError::Config(format!(
                "{} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let index = FlatL2Index::build(vectors, identity.dimensions)?;
        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            embedding_provider: identity.embedding_provider,
            embedding_model: identity.embedding_model,
            dimensions: identity.dimensions,
            chunk_size: identity.chunk_size,
            chunk_overlap: identity.chunk_overlap,
            chunk_count: chunks.len(),
            chunks_sha256: fingerprint(&chunks),
            built_at: Utc::now(),
        };

        Ok(Self {
            manifest,
            index,
            chunks,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    /// Fail unless queries embedded with this model can be compared with the
    /// stored vectors.
    pub fn check_embedder(&self, provider: &str, model: &str, dimensions: usize) -> AppResult<()> {
        if dimensions != self.manifest.dimensions {
            return Err(AppError::Config(format!(
                "Embedding dimension mismatch: index was built with {} dimensions, embedder produces {}. Rebuild the index.",
                self.manifest.dimensions, dimensions
            )));
        }
        if provider != self.manifest.embedding_provider || model != self.manifest.embedding_model {
            return Err(AppError::Config(format!(
                "Embedding model mismatch: index was built with {}/{}, configured {}/{}. Rebuild the index.",
                self.manifest.embedding_provider, self.manifest.embedding_model, provider, model
            )));
        }
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        let sources: HashSet<&str> = self.chunks.iter().map(|c| c.source.as_str()).collect();

        IndexStats {
            chunks_count: self.chunks.len(),
            sources_count: sources.len(),
            dimensions: self.manifest.dimensions,
            embedding_provider: self.manifest.embedding_provider.clone(),
            embedding_model: self.manifest.embedding_model.clone(),
            chunk_size: self.manifest.chunk_size,
            chunk_overlap: self.manifest.chunk_overlap,
            built_at: self.manifest.built_at,
        }
    }

    /// Write this index as a new generation and make it current.
    ///
    /// Returns the generation directory.
    pub fn save(&self, index_dir: &Path) -> AppResult<PathBuf> {
        fs::create_dir_all(index_dir)?;

        let base = format!(
            "{}{}-{}",
            GENERATION_PREFIX,
            self.manifest.built_at.format("%Y%m%dT%H%M%S%3fZ"),
            &self.manifest.chunks_sha256[..12]
        );
        let mut name = base.clone();
        let mut attempt = 1;
        while index_dir.join(&name).exists() {
            name = format!("{}-{}", base, attempt);
            attempt += 1;
        }
        let staging = index_dir.join(format!("{}{}", STAGING_PREFIX, name));
        let generation = index_dir.join(&name);

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        write_file(&staging.join(VECTORS_FILE), |w| {
            bincode::serialize_into(
                w,
                &VectorArtifactRef {
                    manifest: &self.manifest,
                    index: &self.index,
                },
            )
            .map_err(|e| AppError::Serialization(format!("Failed to encode vectors: {}", e)))
        })?;

        write_file(&staging.join(CHUNKS_FILE), |w| {
            serde_json::to_writer(
                w,
                &ChunkArtifactRef {
                    manifest: &self.manifest,
                    chunks: &self.chunks,
                },
            )
            .map_err(AppError::from)
        })?;

        sync_dir(&staging);
        fs::rename(&staging, &generation)?;

        let previous = read_current(index_dir)?;
        publish_current(index_dir, &name)?;
        sync_dir(index_dir);

        let mut keep = vec![name.clone()];
        keep.extend(previous);
        prune_generations(index_dir, &keep);

        tracing::info!(
            "Saved index generation {} ({} chunks, {} dimensions)",
            name,
            self.len(),
            self.dimensions()
        );

        Ok(generation)
    }

    /// Load the current generation from `index_dir`.
    ///
    /// Both artifacts must exist and agree with each other; anything else is
    /// a configuration error.
    pub fn load(index_dir: &Path) -> AppResult<Self> {
        let name = read_current(index_dir)?.ok_or_else(|| {
            AppError::Config(format!(
                "No index found in {}. Run `sage index build` first.",
                index_dir.display()
            ))
        })?;
        let generation = index_dir.join(&name);

        let vectors_path = generation.join(VECTORS_FILE);
        let chunks_path = generation.join(CHUNKS_FILE);
        for path in [&vectors_path, &chunks_path] {
            if !path.is_file() {
                return Err(AppError::Config(format!(
                    "Index generation {} is missing {}. Rebuild the index.",
                    name,
                    path.display()
                )));
            }
        }

        let vectors: VectorArtifact =
            bincode::deserialize_from(BufReader::new(File::open(&vectors_path)?)).map_err(
                |e| AppError::Config(format!("Failed to decode {}: {}", vectors_path.display(), e)),
            )?;
        let chunks: ChunkArtifact =
            serde_json::from_reader(BufReader::new(File::open(&chunks_path)?)).map_err(|e| {
                AppError::Config(format!("Failed to decode {}: {}", chunks_path.display(), e))
            })?;

        let corpus = Self::from_artifacts(vectors, chunks)?;
        tracing::info!(
            "Loaded index generation {} ({} chunks, {} dimensions)",
            name,
            corpus.len(),
            corpus.dimensions()
        );

        Ok(corpus)
    }

    fn from_artifacts(vectors: VectorArtifact, chunks: ChunkArtifact) -> AppResult<Self> {
        let manifest = vectors.manifest;

        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(AppError::Config(format!(
                "Unsupported index format version {} (expected {}). Rebuild the index.",
                manifest.format_version, INDEX_FORMAT_VERSION
            )));
        }
        if manifest != chunks.manifest {
            return Err(AppError::Config(
                "Vector and chunk artifacts belong to different builds".to_string(),
            ));
        }

        vectors.index.check_shape()?;
        if vectors.index.dimensions() != manifest.dimensions {
            return Err(AppError::Config(format!(
                "Stored vectors have dimension {}, manifest says {}",
                vectors.index.dimensions(),
                manifest.dimensions
            )));
        }
        if vectors.index.len() != chunks.chunks.len() || chunks.chunks.len() != manifest.chunk_count
        {
            return Err(AppError::Config(format!(
                "Index is inconsistent: {} vectors, {} chunks, manifest expects {}",
                vectors.index.len(),
                chunks.chunks.len(),
                manifest.chunk_count
            )));
        }
        if fingerprint(&chunks.chunks) != manifest.chunks_sha256 {
            return Err(AppError::Config(
                "Chunk store does not match its manifest fingerprint".to_string(),
            ));
        }

        Ok(Self {
            manifest,
            index: vectors.index,
            chunks: chunks.chunks,
        })
    }
}

/// Whether `index_dir` has a published generation.
pub fn index_exists(index_dir: &Path) -> bool {
    index_dir.join(CURRENT_FILE).is_file()
}

/// SHA-256 over sources, positions and texts of a chunk store, hex encoded.
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.position.to_le_bytes());
        hasher.update((chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn read_current(index_dir: &Path) -> AppResult<Option<String>> {
    let path = index_dir.join(CURRENT_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let name = fs::read_to_string(&path)?.trim().to_string();
    if name.is_empty() || name.contains(|c| c == '/' || c == '\\') || name.starts_with('.') {
        return Err(AppError::Config(format!(
            "Invalid generation name in {}",
            path.display()
        )));
    }
    Ok(Some(name))
}

fn publish_current(index_dir: &Path, name: &str) -> AppResult<()> {
    let tmp = index_dir.join(format!("{}.tmp", CURRENT_FILE));
    write_file(&tmp, |w| w.write_all(name.as_bytes()).map_err(AppError::from))?;
    fs::rename(&tmp, index_dir.join(CURRENT_FILE))?;
    Ok(())
}

/// Create `path`, let `write` fill it, then flush and fsync.
fn write_file<F>(path: &Path, write: F) -> AppResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> AppResult<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn sync_dir(dir: &Path) {
    // Not every platform can open a directory for syncing.
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!("Could not sync directory {}: {}", dir.display(), e);
    }
}

/// Remove generations and leftover staging directories not listed in `keep`.
fn prune_generations(index_dir: &Path, keep: &[String]) {
    let Ok(entries) = fs::read_dir(index_dir) else {
        return;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_generation = name.starts_with(GENERATION_PREFIX) || name.starts_with(STAGING_PREFIX);
        if !is_generation || keep.contains(&name) || !entry.path().is_dir() {
            continue;
        }

        match fs::remove_dir_all(entry.path()) {
            Ok(()) => tracing::debug!("Removed old index generation {}", name),
            Err(e) => tracing::warn!("Failed to remove old generation {}: {}", name, e),
        }
    }
}
