
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::chunking::{ChunkingConfig, chunk_documents};
use crate::config::Config;
use crate::index::VectorIndex;
use crate::loader::{collect_files, load_documents};
use crate::providers::Embedder;
use crate::{RagError, Result};

/// Counts gathered during one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub documents: usize,
    pub chunks: usize,
}

/// A freshly built and persisted index
#[derive(Debug)]
pub struct IngestOutcome {
    pub index: VectorIndex,
    pub stats: IngestStats,
}

/// Runs the load, chunk, embed and persist pipeline
pub struct Ingestor<'a> {
    chunking: ChunkingConfig,
    index_path: PathBuf,
    embedder: &'a dyn Embedder,
}

impl<'a> Ingestor<'a> {
    #[inline]
    pub fn new(config: &Config, embedder: &'a dyn Embedder) -> Self {
        Self {
            chunking: config.chunking.clone(),
            index_path: config.index_path(),
            embedder,
        }
    }

    #[inline]
    pub fn with_index_path(mut self, index_path: impl Into<PathBuf>) -> Self {
        self.index_path = index_path.into();
        self
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Build an index from `paths` and persist it, replacing any previous index
    ///
    /// Directories are searched recursively. Nothing is written unless every
    /// stage succeeds.
    #[inline]
    pub fn ingest_and_index(&self, paths: &[PathBuf]) -> Result<IngestOutcome> {
        let files = collect_files(paths)?;

        let loaded = load_documents(&files).inspect_err(|e| {
            error!("Document loading failed: {}", e);
        })?;
        if loaded.documents.is_empty() {
            error!("No supported documents found");
            return Err(RagError::Validation(
                "No supported documents found. Please select .pdf or .txt files.".to_string(),
            ));
        }
        info!(
            "Loaded {} documents from {} files ({} skipped)",
            loaded.documents.len(),
            loaded.loaded_files.len(),
            loaded.skipped_files.len()
        );

        let chunks = chunk_documents(&loaded.documents, &self.chunking).inspect_err(|e| {
            error!("Chunking failed: {}", e);
        })?;
        info!("Created {} chunks", chunks.len());

        let stats = IngestStats {
            files_loaded: loaded.loaded_files.len(),
            files_skipped: loaded.skipped_files.len(),
            documents: loaded.documents.len(),
            chunks: chunks.len(),
        };

        let index = VectorIndex::build(chunks, self.embedder).inspect_err(|e| {
            error!("Embedding failed: {}", e);
        })?;
        info!("Built index with {} entries", index.len());

        index.persist(&self.index_path).inspect_err(|e| {
            error!("Persisting index failed: {}", e);
        })?;
        info!("Ingestion complete, index saved to {}", self.index_path.display());

        Ok(IngestOutcome { index, stats })
    }
}
