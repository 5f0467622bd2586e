//! Data types for documents, chunks, index entries, and retrieval results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Key-value metadata carried from documents into chunks and index entries.
pub type Metadata = HashMap<String, String>;

/// Metadata key naming where a document came from.
pub const SOURCE_KEY: &str = "source";

/// Source name used when a document carries no `source` metadata.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A source document containing text content and metadata.
///
/// Documents are produced by loaders or built in code (seed data) and are
/// consumed only by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: Metadata::new() }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The provenance of this document, or [`UNKNOWN_SOURCE`].
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or(UNKNOWN_SOURCE)
    }
}

/// A bounded slice of a [`Document`]'s text.
///
/// The metadata is a superset of the parent document's metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Content-addressed identifier, see [`chunk_id`].
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: Metadata,
}

impl Chunk {
    /// Create a chunk with an explicit id.
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }
}

/// The persisted unit inside a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedEntry {
    /// Chunk identifier; the store's primary key.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The chunk metadata.
    pub metadata: Metadata,
    /// Embedding computed from `text`.
    pub embedding: Vec<f32>,
}

/// An [`IndexedEntry`] returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    /// The matched entry. Embeddings are not required to be populated.
    pub entry: IndexedEntry,
    /// Cosine distance to the query, in `[0, 2]`. Smaller is more similar.
    pub distance: f32,
}

/// A query-time retrieval result. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// The chunk text.
    pub content: String,
    /// The chunk metadata.
    pub metadata: Metadata,
    /// Cosine distance to the query.
    pub distance: f32,
    /// `1 - distance`. Not clamped to `[0, 1]`.
    pub relevance_score: f32,
}

impl RetrievedChunk {
    pub(crate) fn from_distance(content: String, metadata: Metadata, distance: f32) -> Self {
        Self { content, metadata, distance, relevance_score: 1.0 - distance }
    }
}

/// Hex SHA-256 of a chunk's text, scoped by its source.
pub fn content_hash(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive a chunk id from `(source, chunk_index, content_hash)`.
///
/// Re-ingesting unchanged content yields the same id, so it overwrites in place.
/// Changed content yields a new id and never silently replaces an unrelated chunk.
pub fn chunk_id(source: &str, chunk_index: usize, hash: &str) -> String {
    let short = hash.get(..16).unwrap_or(hash);
    format!("{source}-{chunk_index}-{short}")
}
