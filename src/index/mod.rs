
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunking::Chunk;
use crate::providers::Embedder;
use crate::{RagError, Result};

/// Tag written into every manifest so foreign directories are rejected on load
pub const INDEX_FORMAT: &str = "doc-chat-index";
/// Bumped whenever the on-disk layout changes
pub const INDEX_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.bin";
const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Metadata describing a persisted index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format: String,
    pub version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A chunk together with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Result of a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity between the query and the chunk, in [-1, 1]
    pub score: f32,
}

/// In-memory vector index searched by exhaustive cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    embedding_model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and build an index from the results
    ///
    /// Nothing is returned unless every chunk was embedded successfully.
    #[inline]
    pub fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self> {
        let batch_size = embedder.batch_size().max(1);
        info!(
            "Embedding {} chunks with {} (batch size {})",
            chunks.len(),
            embedder.model_name(),
            batch_size
        );

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = embedder.embed_documents(&texts).inspect_err(|_| {
                bar.abandon();
            })?;

            if embeddings.len() != batch.len() {
                bar.abandon();
                return Err(RagError::EmbeddingService(format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            vectors.extend(embeddings);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Self::from_entries(embedder.model_name(), entries)
    }

    /// Build an index from already embedded chunks
    #[inline]
    pub fn from_entries(embedding_model: &str, entries: Vec<IndexEntry>) -> Result<Self> {
        let dimension = entries.first().map_or(0, |entry| entry.vector.len());

        for (position, entry) in entries.iter().enumerate() {
            if entry.vector.is_empty() {
                return Err(RagError::EmbeddingService(format!(
                    "embedding {position} is empty"
                )));
            }
            if entry.vector.len() != dimension {
                return Err(RagError::EmbeddingService(format!(
                    "embedding {position} has dimension {}, expected {dimension}",
                    entry.vector.len()
                )));
            }
            if entry.vector.iter().any(|value| !value.is_finite()) {
                return Err(RagError::EmbeddingService(format!(
                    "embedding {position} contains non-finite values"
                )));
            }
        }

        debug!(
            "Built index with {} entries of dimension {}",
            entries.len(),
            dimension
        );

        Ok(Self {
            embedding_model: embedding_model.to_string(),
            dimension,
            entries,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Chunks in insertion order
    #[inline]
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Embed `query` and return the `k` most similar chunks, best first
    #[inline]
    pub fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed_query(query)?;
        self.search_by_vector(&query_vector, k)
    }

    /// Return the `k` entries most similar to `query`, best first
    ///
    /// Entries with equal scores keep their insertion order.
    #[inline]
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::EmbeddingService(format!(
                "query embedding has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }
        if query.iter().any(|value| !value.is_finite()) {
            return Err(RagError::EmbeddingService(
                "query embedding contains non-finite values".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query, &entry.vector)))
            .collect();

        rank_descending(&mut scored);
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .filter_map(|(position, score)| {
                self.entries.get(position).map(|entry| SearchResult {
                    chunk: entry.chunk.clone(),
                    score,
                })
            })
            .collect())
    }

    /// Write the index to `path`, replacing whatever was there
    ///
    /// Files are written to a staging directory beside `path` which is renamed
    /// into place once complete.
    #[inline]
    pub fn persist(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .ok_or_else(|| {
                RagError::Validation(format!("{} is not a valid index path", path.display()))
            })?
            .to_string_lossy()
            .into_owned();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let staging = parent.join(format!(".{name}.staging-{}", Uuid::new_v4()));
        fs::create_dir(&staging)
            .with_context(|| format!("Failed to create staging directory {}", staging.display()))?;

        if let Err(e) = self.write_files(&staging).and_then(|()| replace(path, &staging)) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(
                    "Failed to remove staging directory {}: {}",
                    staging.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        info!(
            "Persisted index with {} chunks to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    fn write_files(&self, dir: &Path) -> Result<()> {
        let manifest = IndexManifest {
            format: INDEX_FORMAT.to_string(),
            version: INDEX_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            chunk_count: self.entries.len(),
            created_at: Utc::now(),
        };
        let manifest_json =
            serde_json::to_vec_pretty(&manifest).context("Failed to serialize index manifest")?;
        fs::write(dir.join(MANIFEST_FILE), manifest_json)
            .context("Failed to write index manifest")?;

        let chunks: Vec<&Chunk> = self.chunks().collect();
        let chunks_json = serde_json::to_vec(&chunks).context("Failed to serialize chunks")?;
        fs::write(dir.join(CHUNKS_FILE), chunks_json).context("Failed to write chunks")?;

        let mut vector_bytes = Vec::with_capacity(self.entries.len() * self.dimension * F32_BYTES);
        for value in self.entries.iter().flat_map(|entry| &entry.vector) {
            vector_bytes.extend_from_slice(&value.to_le_bytes());
        }
        fs::write(dir.join(VECTORS_FILE), vector_bytes).context("Failed to write vectors")?;

        Ok(())
    }

    /// Load an index persisted with [`VectorIndex::persist`]
    ///
    /// Any missing, corrupt or incompatible part is reported as
    /// [`RagError::IndexNotFound`].
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let manifest = read_manifest(path)?;

        let chunks_json = fs::read(path.join(CHUNKS_FILE))
            .map_err(|e| not_found(path, format!("cannot read {CHUNKS_FILE}: {e}")))?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunks_json)
            .map_err(|e| not_found(path, format!("malformed {CHUNKS_FILE}: {e}")))?;
        if chunks.len() != manifest.chunk_count {
            return Err(not_found(
                path,
                format!(
                    "manifest lists {} chunks but {} were found",
                    manifest.chunk_count,
                    chunks.len()
                ),
            ));
        }
        if manifest.chunk_count > 0 && manifest.dimension == 0 {
            return Err(not_found(path, "manifest dimension is zero".to_string()));
        }

        let vector_bytes = fs::read(path.join(VECTORS_FILE))
            .map_err(|e| not_found(path, format!("cannot read {VECTORS_FILE}: {e}")))?;
        let expected_bytes = manifest
            .chunk_count
            .checked_mul(manifest.dimension)
            .and_then(|values| values.checked_mul(F32_BYTES))
            .ok_or_else(|| not_found(path, "manifest sizes overflow".to_string()))?;
        if vector_bytes.len() != expected_bytes {
            return Err(not_found(
                path,
                format!(
                    "{VECTORS_FILE} holds {} bytes, expected {expected_bytes}",
                    vector_bytes.len()
                ),
            ));
        }

        let values: Vec<f32> = vector_bytes
            .chunks_exact(F32_BYTES)
            .map(|bytes| {
                let mut raw = [0_u8; F32_BYTES];
                raw.copy_from_slice(bytes);
                f32::from_le_bytes(raw)
            })
            .collect();
        if values.iter().any(|value| !value.is_finite()) {
            return Err(not_found(
                path,
                format!("{VECTORS_FILE} contains non-finite values"),
            ));
        }

        let entries = if manifest.dimension == 0 {
            Vec::new()
        } else {
            chunks
                .into_iter()
                .zip(values.chunks_exact(manifest.dimension))
                .map(|(chunk, vector)| IndexEntry {
                    chunk,
                    vector: vector.to_vec(),
                })
                .collect()
        };

        info!(
            "Loaded index with {} chunks from {}",
            manifest.chunk_count,
            path.display()
        );

        Ok(Self {
            embedding_model: manifest.embedding_model,
            dimension: manifest.dimension,
            entries,
        })
    }
}

/// Read and check the manifest of a persisted index without loading its data
#[inline]
pub fn read_manifest(path: &Path) -> Result<IndexManifest> {
    if !path.is_dir() {
        return Err(not_found(path, "no index directory".to_string()));
    }

    let manifest_json = fs::read(path.join(MANIFEST_FILE))
        .map_err(|e| not_found(path, format!("cannot read {MANIFEST_FILE}: {e}")))?;
    let manifest: IndexManifest = serde_json::from_slice(&manifest_json)
        .map_err(|e| not_found(path, format!("malformed {MANIFEST_FILE}: {e}")))?;

    if manifest.format != INDEX_FORMAT {
        return Err(not_found(
            path,
            format!("unrecognized index format '{}'", manifest.format),
        ));
    }
    if manifest.version != INDEX_VERSION {
        return Err(not_found(
            path,
            format!(
                "index version {} is not supported (expected {INDEX_VERSION})",
                manifest.version
            ),
        ));
    }

    Ok(manifest)
}

/// Cosine similarity of two vectors, or 0.0 when undefined
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator <= f64::EPSILON {
        return 0.0;
    }
    (dot / denominator) as f32
}

/// Order `(position, score)` pairs best first, keeping insertion order on ties
fn rank_descending(scored: &mut [(usize, f32)]) {
    // total_cmp keeps the comparator a total order even if a score is NaN
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
}

/// Swap the completed staging directory into place
fn replace(path: &Path, staging: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove previous index at {}", path.display()))?;
    } else if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }

    fs::rename(staging, path)
        .with_context(|| format!("Failed to move index into {}", path.display()))?;
    Ok(())
}

fn not_found(path: &Path, reason: String) -> RagError {
    RagError::IndexNotFound {
        path: path.to_path_buf(),
        reason,
    }
}
