//! The vector index: one collection, embedded internally.
//!
//! [`VectorIndex`] is an explicitly constructed handle that binds a
//! [`VectorStore`], an [`EmbeddingProvider`], and a collection name. It is
//! shared (`Arc<VectorIndex>`) by the ingestion pipeline and the retriever.
//! Every embedding and store call runs under a time budget.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_COLLECTION, RagConfig};
use crate::document::{Chunk, IndexedEntry, Metadata};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// A single nearest-neighbour match returned by [`VectorIndex::query`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexHit {
    /// Entry id.
    pub id: String,
    /// Entry text.
    pub text: String,
    /// Entry metadata.
    pub metadata: Metadata,
    /// Cosine distance to the query.
    pub distance: f32,
}

/// Options for opening a [`VectorIndex`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Collection name.
    pub collection: String,
    /// Time budget per embedding or store call.
    pub timeout: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { collection: DEFAULT_COLLECTION.to_string(), timeout: Duration::from_secs(15) }
    }
}

impl From<&RagConfig> for IndexOptions {
    fn from(config: &RagConfig) -> Self {
        Self { collection: config.collection.clone(), timeout: config.operation_timeout() }
    }
}

/// Handle to a single logical collection of embedded chunks.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use serene_rag::{HashingEmbedder, IndexOptions, InMemoryVectorStore, VectorIndex};
///
/// let index = VectorIndex::open(
///     Arc::new(InMemoryVectorStore::new()),
///     Arc::new(HashingEmbedder::default()),
///     IndexOptions::default(),
/// )
/// .await?;
/// index.upsert(&chunks).await?;
/// let hits = index.query("trouble sleeping", 3).await?;
/// ```
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    timeout: Duration,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("backend", &self.store.backend())
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VectorIndex {
    /// Open the index, creating its collection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexWrite`] or [`RagError::Timeout`] if the
    /// collection cannot be created.
    pub async fn open(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        options: IndexOptions,
    ) -> Result<Self> {
        let index =
            Self { store, embedder, collection: options.collection, timeout: options.timeout };
        let dimensions = index.embedder.dimensions();
        index
            .bounded("create_collection", index.store.create_collection(&index.collection, dimensions))
            .await?;
        info!(
            backend = index.store.backend(),
            collection = %index.collection,
            dimensions,
            "vector index opened"
        );
        Ok(index)
    }

    /// Release the underlying store.
    pub async fn close(&self) {
        self.store.close().await;
        info!(backend = self.store.backend(), collection = %self.collection, "vector index closed");
    }

    /// The collection this index reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and write chunks. Entries with an existing id are overwritten.
    ///
    /// An empty slice is a logged no-op. The batch is written atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexWrite`] if embedding or the store write fails,
    /// or [`RagError::Timeout`] if either exceeds the time budget.
    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            info!(collection = %self.collection, "upsert called with no chunks; nothing written");
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self
            .bounded("embed_batch", self.embedder.embed_batch(&texts))
            .await
            .map_err(|e| self.write_error(e))?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::IndexWrite {
                backend: self.store.backend().to_string(),
                message: format!(
                    "embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    chunks.len()
                ),
            });
        }

        let entries: Vec<IndexedEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedEntry {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                embedding,
            })
            .collect();

        self.bounded("upsert", self.store.upsert(&self.collection, &entries)).await?;
        debug!(collection = %self.collection, count = entries.len(), "upserted chunks");
        Ok(())
    }

    /// Return the `k` entries nearest to `text`, ascending by cosine distance.
    ///
    /// Returns every entry when the collection holds fewer than `k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexQuery`] for `k == 0` or a failed embedding or
    /// search, and [`RagError::Timeout`] when the time budget is exceeded.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>> {
        if k == 0 {
            return Err(RagError::IndexQuery {
                backend: self.store.backend().to_string(),
                message: "k must be at least 1".to_string(),
            });
        }

        let embedding = self
            .bounded("embed", self.embedder.embed(text))
            .await
            .map_err(|e| self.query_error(e))?;

        let scored =
            self.bounded("search", self.store.search(&self.collection, &embedding, k)).await?;

        Ok(scored
            .into_iter()
            .map(|s| IndexHit {
                id: s.entry.id,
                text: s.entry.text,
                metadata: s.entry.metadata,
                distance: s.distance,
            })
            .collect())
    }

    /// Number of entries in the collection.
    pub async fn count(&self) -> Result<usize> {
        self.bounded("count", self.store.count(&self.collection)).await
    }

    /// Remove every entry by dropping and recreating the collection.
    pub async fn clear(&self) -> Result<()> {
        self.bounded("delete_collection", self.store.delete_collection(&self.collection)).await?;
        let dimensions = self.embedder.dimensions();
        self.bounded("create_collection", self.store.create_collection(&self.collection, dimensions))
            .await?;
        warn!(collection = %self.collection, "vector index cleared");
        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "vector index operation timed out");
                Err(RagError::Timeout { operation, after: self.timeout })
            }
        }
    }

    fn write_error(&self, e: RagError) -> RagError {
        match e {
            RagError::Embedding { provider, message } => RagError::IndexWrite {
                backend: self.store.backend().to_string(),
                message: format!("embedding failed ({provider}): {message}"),
            },
            other => other,
        }
    }

    fn query_error(&self, e: RagError) -> RagError {
        match e {
            RagError::Embedding { provider, message } => RagError::IndexQuery {
                backend: self.store.backend().to_string(),
                message: format!("query embedding failed ({provider}): {message}"),
            },
            other => other,
        }
    }
}
