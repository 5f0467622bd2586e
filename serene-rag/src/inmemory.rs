//! In-memory vector store using cosine distance.
//!
//! [`InMemoryVectorStore`] keeps collections in a `HashMap` guarded by a
//! `tokio::sync::RwLock`. It suits tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexedEntry, ScoredEntry};
use crate::embedding::cosine_distance;
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

const BACKEND: &str = "in-memory";

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    entries: HashMap<String, IndexedEntry>,
}

/// An in-memory vector store.
///
/// Collections are stored as nested maps: collection name → entry id → entry.
/// An upsert validates the whole batch before touching the map and holds the
/// write lock throughout, so readers never observe half of a batch.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection: &str) -> String {
        format!("collection '{collection}' does not exist")
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, entries: HashMap::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| RagError::IndexWrite {
            backend: BACKEND.to_string(),
            message: Self::missing(collection),
        })?;

        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != store.dimensions) {
            return Err(RagError::IndexWrite {
                backend: BACKEND.to_string(),
                message: format!(
                    "entry '{}' has {} dimensions, collection '{collection}' expects {}",
                    bad.id,
                    bad.embedding.len(),
                    store.dimensions
                ),
            });
        }

        for entry in entries {
            store.entries.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| RagError::IndexQuery {
            backend: BACKEND.to_string(),
            message: Self::missing(collection),
        })?;

        let scored = store
            .entries
            .values()
            .map(|entry| ScoredEntry {
                distance: cosine_distance(&entry.embedding, embedding),
                entry: entry.clone(),
            })
            .collect();

        Ok(rank(scored, top_k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(|c| c.entries.len()).unwrap_or(0))
    }
}
