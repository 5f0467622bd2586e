//! Ingestion pipeline orchestrator.
//!
//! The [`IngestionPipeline`] coordinates the write path: loader → chunker →
//! vector index. A source that fails to load is recorded and skipped; a
//! failed index write aborts the call and is returned to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use serene_rag::{IngestionPipeline, RecursiveChunker};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .index(index.clone())
//!     .chunker(Arc::new(RecursiveChunker::from_config(&config)))
//!     .build()?;
//!
//! let result = pipeline.ingest_directory("./knowledge").await?;
//! println!("{} chunks written, {} sources skipped", result.chunks_written, result.skipped.len());
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::loader::{DocumentLoader, LoaderSet, discover_files};
use crate::seed::seed_documents;

/// Outcome of one ingestion call.
#[derive(Debug, Default)]
pub struct IngestResult {
    /// Documents that reached the chunker.
    pub documents_seen: usize,
    /// Chunks embedded and written to the index.
    pub chunks_written: usize,
    /// Sources that failed to load, as [`RagError::Ingestion`] values.
    pub skipped: Vec<RagError>,
}

/// The ingestion pipeline. Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    index: Arc<VectorIndex>,
    chunker: Arc<dyn Chunker>,
    loader: Arc<dyn DocumentLoader>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// The index this pipeline writes to.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Chunk and index in-memory documents.
    ///
    /// Zero documents is not an error: nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexWrite`] or [`RagError::Timeout`] if the index
    /// write fails. Nothing from the batch is written in that case.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestResult> {
        let chunks = self.chunker.split(documents);
        self.write(documents.len(), chunks, Vec::new()).await
    }

    /// Load every path with `loader`, then chunk and index what loaded.
    ///
    /// A path that fails to load is logged and recorded in
    /// [`IngestResult::skipped`]; the remaining paths continue.
    ///
    /// # Errors
    ///
    /// Returns the index write error, as for [`ingest`](Self::ingest).
    pub async fn ingest_sources<P: AsRef<Path>>(
        &self,
        loader: &dyn DocumentLoader,
        paths: &[P],
    ) -> Result<IngestResult> {
        let mut documents = Vec::new();
        let mut skipped = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match loader.load(path).await {
                Ok(docs) => documents.extend(docs),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping source");
                    skipped.push(e);
                }
            }
        }

        let chunks = self.chunker.split(&documents);
        self.write(documents.len(), chunks, skipped).await
    }

    /// Load `paths` with the pipeline's loader, then chunk and index them.
    ///
    /// # Errors
    ///
    /// Returns the index write error, as for [`ingest`](Self::ingest).
    pub async fn ingest_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IngestResult> {
        self.ingest_sources(self.loader.as_ref(), paths).await
    }

    /// Ingest every file under `dir` with the pipeline's loader.
    ///
    /// Unsupported files are reported in [`IngestResult::skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingestion`] if `dir` is not a directory, or the
    /// index write error.
    pub async fn ingest_directory(&self, dir: impl AsRef<Path>) -> Result<IngestResult> {
        let dir = dir.as_ref();
        let files = discover_files(dir)?;
        info!(dir = %dir.display(), file_count = files.len(), "ingesting directory");
        self.ingest_files(&files).await
    }

    /// Ingest the built-in seed documents.
    pub async fn seed(&self) -> Result<IngestResult> {
        self.ingest(&seed_documents()).await
    }

    async fn write(
        &self,
        documents_seen: usize,
        chunks: Vec<Chunk>,
        skipped: Vec<RagError>,
    ) -> Result<IngestResult> {
        self.index.upsert(&chunks).await.map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "index write failed during ingestion");
            e
        })?;

        let result = IngestResult { documents_seen, chunks_written: chunks.len(), skipped };
        info!(
            documents_seen = result.documents_seen,
            chunks_written = result.chunks_written,
            skipped = result.skipped.len(),
            "ingestion complete"
        );
        Ok(result)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// The index is required. The chunker defaults to [`RecursiveChunker::default()`]
/// and the loader to [`LoaderSet::default()`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    index: Option<Arc<VectorIndex>>,
    chunker: Option<Arc<dyn Chunker>>,
    loader: Option<Arc<dyn DocumentLoader>>,
}

impl IngestionPipelineBuilder {
    /// Set the vector index to write to.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the loader used by [`IngestionPipeline::ingest_directory`].
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no index was set.
    pub fn build(self) -> Result<IngestionPipeline> {
        let index = self.index.ok_or_else(|| RagError::Config("index is required".to_string()))?;
        Ok(IngestionPipeline {
            index,
            chunker: self.chunker.unwrap_or_else(|| Arc::new(RecursiveChunker::default())),
            loader: self.loader.unwrap_or_else(|| Arc::new(LoaderSet::default())),
        })
    }
}
