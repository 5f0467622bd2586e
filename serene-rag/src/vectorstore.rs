//! Vector store trait for storing and searching embedded entries.

use async_trait::async_trait;

use crate::document::{IndexedEntry, ScoredEntry};
use crate::error::Result;

/// A storage backend for embedded entries with cosine-distance search.
///
/// Implementations manage named collections of [`IndexedEntry`]s. Writes to a
/// collection are serialised; reads may run concurrently with each other.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 1024).await?;
/// store.upsert("docs", &entries).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in errors and logs.
    fn backend(&self) -> &'static str;

    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or overwrite entries by id.
    ///
    /// The whole slice is written atomically: on error, no entry of the
    /// batch is visible.
    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()>;

    /// Return up to `top_k` entries ordered by ascending cosine distance.
    ///
    /// Ties are broken by ascending id so results are deterministic.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>>;

    /// Number of entries in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Release backend resources. Further calls may fail.
    async fn close(&self) {}
}

/// Sort scored entries by ascending distance, then id, and keep `top_k`.
pub(crate) fn rank(mut scored: Vec<ScoredEntry>, top_k: usize) -> Vec<ScoredEntry> {
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
    scored.truncate(top_k);
    scored
}
